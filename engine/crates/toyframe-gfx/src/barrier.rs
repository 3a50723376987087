//! Barrier 记录
//!
//! 由 `BarrierTracker` 或手动录制生成，在编码阶段转换为
//! `vk::ImageMemoryBarrier2` / `vk::BufferMemoryBarrier2`。

use ash::vk;

use crate::handles::GpuResourceHandle;
use crate::resource_state::{BufferState, ImageState};

/// image 的子资源范围；为 `None` 时表示整个 image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubresourceRange {
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl SubresourceRange {
    /// 单个 mip 的所有 layer
    pub fn mip(mip: u32, layer_count: u32) -> Self {
        Self {
            base_mip: mip,
            mip_count: 1,
            base_layer: 0,
            layer_count,
        }
    }
}

/// 图像 Barrier 描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBarrierDesc {
    pub handle: GpuResourceHandle,
    pub src_state: ImageState,
    pub dst_state: ImageState,
    /// COLOR / DEPTH / STENCIL
    pub aspect: vk::ImageAspectFlags,
    pub range: Option<SubresourceRange>,
}

impl ImageBarrierDesc {
    pub fn new(handle: GpuResourceHandle, src_state: ImageState, dst_state: ImageState) -> Self {
        Self {
            handle,
            src_state,
            dst_state,
            aspect: vk::ImageAspectFlags::COLOR,
            range: None,
        }
    }

    pub fn with_aspect(mut self, aspect: vk::ImageAspectFlags) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_range(mut self, range: SubresourceRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        match self.range {
            Some(range) => vk::ImageSubresourceRange {
                aspect_mask: self.aspect,
                base_mip_level: range.base_mip,
                level_count: range.mip_count,
                base_array_layer: range.base_layer,
                layer_count: range.layer_count,
            },
            None => vk::ImageSubresourceRange {
                aspect_mask: self.aspect,
                base_mip_level: 0,
                level_count: vk::REMAINING_MIP_LEVELS,
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            },
        }
    }

    /// 需要提供实际的 vk::Image
    pub fn to_vk(&self, image: vk::Image) -> vk::ImageMemoryBarrier2<'static> {
        vk::ImageMemoryBarrier2::default()
            .src_stage_mask(self.src_state.stage)
            .src_access_mask(self.src_state.src_access())
            .dst_stage_mask(self.dst_state.stage)
            .dst_access_mask(self.dst_state.access)
            .old_layout(self.src_state.layout)
            .new_layout(self.dst_state.layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(self.subresource_range())
    }
}

/// 缓冲区 Barrier 描述，总是覆盖整个 buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferBarrierDesc {
    pub handle: GpuResourceHandle,
    pub src_state: BufferState,
    pub dst_state: BufferState,
}

impl BufferBarrierDesc {
    pub fn new(handle: GpuResourceHandle, src_state: BufferState, dst_state: BufferState) -> Self {
        Self {
            handle,
            src_state,
            dst_state,
        }
    }

    pub fn to_vk(&self, buffer: vk::Buffer) -> vk::BufferMemoryBarrier2<'static> {
        vk::BufferMemoryBarrier2::default()
            .src_stage_mask(self.src_state.stage)
            .src_access_mask(self.src_state.access)
            .dst_stage_mask(self.dst_state.stage)
            .dst_access_mask(self.dst_state.access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE)
    }
}

/// 一次 `vkCmdPipelineBarrier2` 中的所有 barrier
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BarrierBatch {
    pub image_barriers: Vec<ImageBarrierDesc>,
    pub buffer_barriers: Vec<BufferBarrierDesc>,
}

impl BarrierBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(barrier: ImageBarrierDesc) -> Self {
        Self {
            image_barriers: vec![barrier],
            buffer_barriers: vec![],
        }
    }

    pub fn add_image_barrier(&mut self, barrier: ImageBarrierDesc) {
        self.image_barriers.push(barrier);
    }

    pub fn add_buffer_barrier(&mut self, barrier: BufferBarrierDesc) {
        self.buffer_barriers.push(barrier);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.image_barriers.is_empty() && self.buffer_barriers.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.image_barriers.len() + self.buffer_barriers.len()
    }

    pub fn find_image(&self, handle: GpuResourceHandle) -> Option<&ImageBarrierDesc> {
        self.image_barriers.iter().find(|barrier| barrier.handle == handle)
    }
}

/// 根据 format 推断 image aspect
pub fn infer_image_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
            vk::ImageAspectFlags::DEPTH
        }

        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,

        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }

        _ => vk::ImageAspectFlags::COLOR,
    }
}
