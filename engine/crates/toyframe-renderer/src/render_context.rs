use ash::vk;
use itertools::Itertools;

use toyframe_gfx::barrier_tracker::BarrierTracker;
use toyframe_gfx::device::GpuDevice;
use toyframe_gfx::handles::GpuResourceHandle;
use toyframe_gfx::resource_state::ImageState;
use toyframe_gfx::resource_table::{ImageDesc, ResourceKind, ResourceTable};
use toyframe_render_graph::frame_graph::FrameBindings;
use toyframe_render_graph::texture_upload::TextureUploader;
use toyframe_render_graph::uniform::UniformStore;

use crate::settings::FrameSettings;

/// 渲染过程中共享的状态：资源表、资源状态、帧 uniform 和 backbuffer
///
/// 由调用者显式传递，不存在全局的上下文
pub struct RenderContext {
    pub resources: ResourceTable,
    pub tracker: BarrierTracker,
    pub uniforms: UniformStore,
    backbuffer: GpuResourceHandle,
    frame_settings: FrameSettings,
}

// new & init
impl RenderContext {
    pub fn new(device: &mut dyn GpuDevice, frame_settings: FrameSettings) -> Self {
        let mut resources = ResourceTable::new();
        // 原生对象每帧 acquire 之后绑定
        let backbuffer = resources.register(
            "backbuffer",
            ResourceKind::Image(ImageDesc::new_2d(
                frame_settings.frame_extent,
                frame_settings.color_format,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            )),
            ImageState::SWAPCHAIN_ACQUIRED,
        );
        let uniforms = UniformStore::new(&mut resources, device, frame_settings.frames_in_flight);

        Self {
            resources,
            tracker: BarrierTracker::new(),
            uniforms,
            backbuffer,
            frame_settings,
        }
    }
}

// destroy
impl RenderContext {
    /// 释放 uniform buffer、sampler 和所有由 device 分配的资源；backbuffer 属于 swapchain，不释放
    pub fn destroy(self, device: &mut dyn GpuDevice) {
        let Self {
            mut resources,
            uniforms,
            backbuffer,
            ..
        } = self;
        uniforms.destroy(&mut resources, device);
        resources.destroy_samplers(device);

        let owned = resources.handles().filter(|handle| *handle != backbuffer).collect_vec();
        for handle in owned {
            resources.destroy(device, handle);
        }
    }
}

// getters
impl RenderContext {
    #[inline]
    pub fn backbuffer(&self) -> GpuResourceHandle {
        self.backbuffer
    }

    #[inline]
    pub fn frame_settings(&self) -> &FrameSettings {
        &self.frame_settings
    }

    pub fn frame_bindings(&self, slot: usize) -> FrameBindings {
        FrameBindings {
            backbuffer: self.backbuffer,
            frame_uniform: self.uniforms.buffer(slot),
        }
    }

    pub fn texture_uploader<'a>(&'a mut self, device: &'a mut dyn GpuDevice) -> TextureUploader<'a> {
        TextureUploader::new(&mut self.resources, &mut self.tracker, device)
    }
}

// update
impl RenderContext {
    /// swapchain 重建后更新帧大小
    pub fn on_resized(&mut self, extent: vk::Extent2D) {
        self.frame_settings.frame_extent = extent;
        self.resources.set_image_extent(self.backbuffer, extent);
    }
}
