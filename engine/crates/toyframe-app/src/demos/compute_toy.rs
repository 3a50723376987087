//! compute shader 写入 storage image，再 blit 到 backbuffer

use ash::vk;

use toyframe_gfx::handles::GpuResourceHandle;
use toyframe_gfx::resource_state::{BufferState, ImageState};
use toyframe_gfx::resource_table::ImageDesc;
use toyframe_render_graph::frame_graph::FrameGraph;
use toyframe_render_graph::pass::{PassDesc, ResourceRef};

use crate::demos::{DemoInit, ToyDemo};

/// compute shader 的 local size，x 和 y 相同
const WORK_GROUP_SIZE: u32 = 32;

#[derive(Default)]
pub struct ComputeToy {
    canvas: Option<GpuResourceHandle>,
}

impl ComputeToy {
    pub const NAME: &'static str = "compute_toy";
    pub const PROGRAM: &'static str = "toy_compute";

    pub fn canvas(&self) -> Option<GpuResourceHandle> {
        self.canvas
    }

    fn group_count(extent: vk::Extent2D) -> [u32; 3] {
        [
            extent.width.div_ceil(WORK_GROUP_SIZE),
            extent.height.div_ceil(WORK_GROUP_SIZE),
            1,
        ]
    }
}

impl ToyDemo for ComputeToy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn programs(&self) -> &'static [&'static str] {
        &[Self::PROGRAM]
    }

    fn init(&mut self, init: &mut DemoInit<'_>) -> anyhow::Result<FrameGraph> {
        log::info!("compute toy.");

        // canvas 大小固定为初始分辨率，blit 时缩放到 backbuffer
        let extent = init.ctx.frame_settings().frame_extent;
        let canvas = init.ctx.resources.create_image(
            init.device,
            "compute-canvas",
            ImageDesc::new_2d(
                extent,
                vk::Format::R8G8B8A8_UNORM,
                vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::TRANSFER_SRC,
            ),
        );
        self.canvas = Some(canvas);

        let mut graph = FrameGraph::new();
        graph
            .add_pass(
                PassDesc::compute("toy-compute", Self::PROGRAM, Self::group_count(extent))
                    .storage(0, canvas, ImageState::STORAGE_WRITE_COMPUTE)
                    .uniform(1, BufferState::UNIFORM_COMPUTE),
            )
            .add_pass(PassDesc::blit("canvas-to-backbuffer", canvas, ResourceRef::Backbuffer))
            .present_backbuffer();
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessDevice, SolidColorLoader};
    use toyframe_crate_tools::app_config::AppConfig;
    use toyframe_render_graph::pass::Invocation;
    use toyframe_renderer::render_context::RenderContext;
    use toyframe_renderer::settings::FrameSettings;

    #[test]
    fn test_group_count_rounds_up() {
        let extent = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        assert_eq!(ComputeToy::group_count(extent), [40, 23, 1]);
    }

    #[test]
    fn test_graph_shape() {
        let mut device = HeadlessDevice::default();
        let mut ctx = RenderContext::new(&mut device, FrameSettings::default());
        let mut toy = ComputeToy::default();
        let graph = toy
            .init(&mut DemoInit {
                ctx: &mut ctx,
                device: &mut device,
                assets: &SolidColorLoader::default(),
                config: &AppConfig::default(),
            })
            .unwrap();

        assert_eq!(graph.pass_names(), vec!["toy-compute", "canvas-to-backbuffer"]);
        let canvas = ResourceRef::Fixed(toy.canvas().unwrap());
        assert!(graph.passes()[0].writes(canvas));
        assert_eq!(
            graph.passes()[1].invocation,
            Invocation::Blit {
                src: canvas,
                dst: ResourceRef::Backbuffer,
            }
        );
        assert_eq!(graph.dependencies().len(), 1);
    }
}
