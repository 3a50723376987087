//! 命令录制
//!
//! `CommandRecorder` 只做追加，录制结束后通过 `finish` 封存为 `CommandList`，
//! 再由 `GpuDevice` 提交或由 `VkCommandEncoder` 翻译为 vulkan 命令。

use ash::vk;

use crate::barrier::BarrierBatch;
use crate::handles::{GpuResourceHandle, PipelineHandle, SamplerHandle};

#[derive(Clone, Debug, PartialEq)]
pub struct ColorAttachment {
    pub image: GpuResourceHandle,
    /// `None` 表示不清除（load op 为 DONT_CARE）
    pub clear: Option<[f32; 4]>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageViewKind {
    #[default]
    Default,
    Cube,
}

/// 绑定到 shader 的一个资源，句柄与 layout 都已经解析
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBinding {
    pub binding: u32,
    pub resource: GpuResourceHandle,
    pub sampler: Option<SamplerHandle>,
    pub view: ImageViewKind,
    /// image 在绑定时的 layout；buffer 为 None
    pub layout: Option<vk::ImageLayout>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlitRegion {
    pub src: GpuResourceHandle,
    pub src_mip: u32,
    pub src_extent: vk::Extent2D,
    pub src_layout: vk::ImageLayout,
    pub dst: GpuResourceHandle,
    pub dst_mip: u32,
    pub dst_extent: vk::Extent2D,
    pub dst_layout: vk::ImageLayout,
    pub layer_count: u32,
    pub aspect: vk::ImageAspectFlags,
    pub filter: vk::Filter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferImageCopy {
    pub buffer: GpuResourceHandle,
    pub buffer_offset: vk::DeviceSize,
    pub image: GpuResourceHandle,
    pub image_layout: vk::ImageLayout,
    pub mip: u32,
    pub layer: u32,
    pub extent: vk::Extent2D,
    pub aspect: vk::ImageAspectFlags,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GfxCommand {
    PipelineBarrier(BarrierBatch),
    BeginRendering {
        color_attachments: Vec<ColorAttachment>,
        render_area: vk::Extent2D,
    },
    EndRendering,
    BindPipeline {
        pipeline: PipelineHandle,
        bind_point: vk::PipelineBindPoint,
    },
    BindResources {
        pipeline: PipelineHandle,
        bind_point: vk::PipelineBindPoint,
        bindings: Vec<ResolvedBinding>,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    Dispatch {
        group_count: [u32; 3],
    },
    BlitImage(BlitRegion),
    CopyBufferToImage(BufferImageCopy),
}

/// 录制完成的命令序列
#[derive(Clone, Debug, Default)]
pub struct CommandList {
    label: String,
    commands: Vec<GfxCommand>,
}

impl CommandList {
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn commands(&self) -> &[GfxCommand] {
        &self.commands
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn barrier_batches(&self) -> impl Iterator<Item = &BarrierBatch> {
        self.commands.iter().filter_map(|command| match command {
            GfxCommand::PipelineBarrier(batch) => Some(batch),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|command| matches!(command, GfxCommand::Draw { .. })).count()
    }
}

/// 命令录制器，每个 FrameSlot 持有一个，每帧重置
#[derive(Debug, Default)]
pub struct CommandRecorder {
    label: String,
    commands: Vec<GfxCommand>,
    sealed: bool,
}

// new & init
impl CommandRecorder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
            sealed: false,
        }
    }

    /// 清空内容，重新开始录制
    pub fn reset(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.commands.clear();
        self.sealed = false;
    }

    /// 封存命令；重复调用会 panic
    pub fn finish(&mut self) -> CommandList {
        assert!(!self.sealed, "command recorder {} finished twice", self.label);
        self.sealed = true;
        CommandList {
            label: self.label.clone(),
            commands: std::mem::take(&mut self.commands),
        }
    }
}

// getters
impl CommandRecorder {
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    #[inline]
    pub fn commands(&self) -> &[GfxCommand] {
        &self.commands
    }
}

// 录制
impl CommandRecorder {
    fn push(&mut self, command: GfxCommand) {
        assert!(!self.sealed, "command recorder {} is sealed", self.label);
        self.commands.push(command);
    }

    /// 空的 batch 不会被录制
    pub fn pipeline_barrier(&mut self, batch: BarrierBatch) {
        if batch.is_empty() {
            return;
        }
        self.push(GfxCommand::PipelineBarrier(batch));
    }

    pub fn begin_rendering(&mut self, color_attachments: Vec<ColorAttachment>, render_area: vk::Extent2D) {
        self.push(GfxCommand::BeginRendering {
            color_attachments,
            render_area,
        });
    }

    pub fn end_rendering(&mut self) {
        self.push(GfxCommand::EndRendering);
    }

    pub fn bind_pipeline(&mut self, pipeline: PipelineHandle, bind_point: vk::PipelineBindPoint) {
        self.push(GfxCommand::BindPipeline { pipeline, bind_point });
    }

    pub fn bind_resources(
        &mut self,
        pipeline: PipelineHandle,
        bind_point: vk::PipelineBindPoint,
        bindings: Vec<ResolvedBinding>,
    ) {
        self.push(GfxCommand::BindResources {
            pipeline,
            bind_point,
            bindings,
        });
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.push(GfxCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    pub fn dispatch(&mut self, group_count: [u32; 3]) {
        self.push(GfxCommand::Dispatch { group_count });
    }

    pub fn blit_image(&mut self, region: BlitRegion) {
        self.push(GfxCommand::BlitImage(region));
    }

    pub fn copy_buffer_to_image(&mut self, copy: BufferImageCopy) {
        self.push(GfxCommand::CopyBufferToImage(copy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::ImageBarrierDesc;
    use crate::resource_state::ImageState;
    use slotmap::SlotMap;

    fn handle() -> GpuResourceHandle {
        let mut map: SlotMap<GpuResourceHandle, ()> = SlotMap::with_key();
        map.insert(())
    }

    #[test]
    fn test_record_in_order() {
        let target = handle();
        let mut recorder = CommandRecorder::new("[F0A]");
        recorder.pipeline_barrier(BarrierBatch::image(ImageBarrierDesc::new(
            target,
            ImageState::UNDEFINED,
            ImageState::COLOR_ATTACHMENT_WRITE,
        )));
        recorder.begin_rendering(
            vec![ColorAttachment {
                image: target,
                clear: None,
            }],
            vk::Extent2D {
                width: 64,
                height: 64,
            },
        );
        recorder.draw(3, 1);
        recorder.end_rendering();

        let list = recorder.finish();
        assert_eq!(list.label(), "[F0A]");
        assert_eq!(list.len(), 4);
        assert!(matches!(list.commands()[0], GfxCommand::PipelineBarrier(_)));
        assert!(matches!(list.commands()[3], GfxCommand::EndRendering));
        assert_eq!(list.draw_count(), 1);
    }

    #[test]
    fn test_empty_barrier_is_skipped() {
        let mut recorder = CommandRecorder::new("empty");
        recorder.pipeline_barrier(BarrierBatch::new());
        assert!(recorder.finish().is_empty());
    }

    #[test]
    #[should_panic(expected = "finished twice")]
    fn test_finish_twice() {
        let mut recorder = CommandRecorder::new("twice");
        let _ = recorder.finish();
        let _ = recorder.finish();
    }

    #[test]
    #[should_panic(expected = "is sealed")]
    fn test_record_after_finish() {
        let mut recorder = CommandRecorder::new("sealed");
        let _ = recorder.finish();
        recorder.draw(3, 1);
    }

    #[test]
    fn test_reset_reopens() {
        let mut recorder = CommandRecorder::new("slot-0");
        recorder.dispatch([8, 8, 1]);
        let _ = recorder.finish();

        recorder.reset("slot-0 again");
        assert!(!recorder.is_sealed());
        assert!(recorder.commands().is_empty());
        recorder.draw(3, 1);
        assert_eq!(recorder.finish().len(), 1);
    }
}
