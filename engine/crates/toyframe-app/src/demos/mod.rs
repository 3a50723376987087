use toyframe_crate_tools::app_config::AppConfig;
use toyframe_gfx::device::GpuDevice;
use toyframe_render_graph::frame_graph::FrameGraph;
use toyframe_render_graph::texture_upload::AssetLoader;
use toyframe_renderer::render_context::RenderContext;

pub mod compute_toy;
pub mod inflight_toy;
pub mod shader_toy;

/// demo 初始化时可以使用的上下文
pub struct DemoInit<'a> {
    pub ctx: &'a mut RenderContext,
    pub device: &'a mut dyn GpuDevice,
    pub assets: &'a dyn AssetLoader,
    pub config: &'a AppConfig,
}

/// 一个 demo 的接口
///
/// demo 在 `init` 中创建自己的资源，并返回一个固定顺序的 pass 列表，
/// 之后每一帧都按这个列表录制。
///
/// ```ignore
/// struct MyToy;
///
/// impl ToyDemo for MyToy {
///     fn name(&self) -> &'static str { "my_toy" }
///     fn programs(&self) -> &'static [&'static str] { &["my_program"] }
///     fn init(&mut self, init: &mut DemoInit<'_>) -> anyhow::Result<FrameGraph> {
///         let mut graph = FrameGraph::new();
///         graph.add_pass(PassDesc::fullscreen("main", "my_program").color_target(ResourceRef::Backbuffer, None));
///         graph.present_backbuffer();
///         Ok(graph)
///     }
/// }
/// ```
pub trait ToyDemo {
    fn name(&self) -> &'static str;

    /// demo 用到的 shader program，pipeline provider 必须能提供所有 program
    fn programs(&self) -> &'static [&'static str];

    fn init(&mut self, init: &mut DemoInit<'_>) -> anyhow::Result<FrameGraph>;

    /// 每帧更新逻辑（可选），在写入 uniform 之前调用
    fn update(&mut self, _ctx: &mut RenderContext) {}
}

pub const DEMO_NAMES: [&str; 3] = [
    compute_toy::ComputeToy::NAME,
    shader_toy::ShaderToy::NAME,
    inflight_toy::InflightToy::NAME,
];

pub fn demo_by_name(name: &str) -> Option<Box<dyn ToyDemo>> {
    match name {
        compute_toy::ComputeToy::NAME => Some(Box::new(compute_toy::ComputeToy::default())),
        shader_toy::ShaderToy::NAME => Some(Box::new(shader_toy::ShaderToy)),
        inflight_toy::InflightToy::NAME => Some(Box::new(inflight_toy::InflightToy::default())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_by_name() {
        for name in DEMO_NAMES {
            let demo = demo_by_name(name).unwrap();
            assert_eq!(demo.name(), name);
            assert!(!demo.programs().is_empty());
        }
        assert!(demo_by_name("no_such_toy").is_none());
    }
}
