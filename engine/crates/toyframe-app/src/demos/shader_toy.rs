use toyframe_gfx::resource_state::BufferState;
use toyframe_render_graph::frame_graph::FrameGraph;
use toyframe_render_graph::pass::{PassDesc, ResourceRef};

use crate::demos::{DemoInit, ToyDemo};

/// 一个全屏 pass 直接画到 backbuffer
pub struct ShaderToy;

impl ShaderToy {
    pub const NAME: &'static str = "shader_toy";
    pub const PROGRAM: &'static str = "toy_graphics";
}

impl ToyDemo for ShaderToy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn programs(&self) -> &'static [&'static str] {
        &[Self::PROGRAM]
    }

    fn init(&mut self, _init: &mut DemoInit<'_>) -> anyhow::Result<FrameGraph> {
        log::info!("shader toy.");

        let mut graph = FrameGraph::new();
        graph
            .add_pass(
                PassDesc::fullscreen("toy", Self::PROGRAM)
                    .uniform(0, BufferState::UNIFORM_FRAGMENT)
                    .color_target(ResourceRef::Backbuffer, Some([0.0, 0.0, 0.0, 1.0])),
            )
            .present_backbuffer();
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessDevice, SolidColorLoader};
    use toyframe_crate_tools::app_config::AppConfig;
    use toyframe_renderer::render_context::RenderContext;
    use toyframe_renderer::settings::FrameSettings;

    #[test]
    fn test_single_pass() {
        let mut device = HeadlessDevice::default();
        let mut ctx = RenderContext::new(&mut device, FrameSettings::default());
        let graph = ShaderToy
            .init(&mut DemoInit {
                ctx: &mut ctx,
                device: &mut device,
                assets: &SolidColorLoader::default(),
                config: &AppConfig::default(),
            })
            .unwrap();

        assert_eq!(graph.pass_names(), vec!["toy"]);
        assert!(graph.passes()[0].writes(ResourceRef::Backbuffer));
        assert!(graph.passes()[0].uses(ResourceRef::FrameUniform));
        assert!(graph.dependencies().is_empty());
    }
}
