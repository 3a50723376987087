//! 不打开窗口地运行一个 demo 若干帧，打印执行计划和每帧的提交
//!
//! ```text
//! headless-toy [demo] [frames]
//! headless-toy inflight_toy 10
//! ```

use anyhow::Context;
use itertools::Itertools;

use toyframe_app::demos::{DEMO_NAMES, demo_by_name};
use toyframe_app::headless::{DeviceCall, HeadlessDevice, HeadlessPipelines, HeadlessSurface, HeadlessWindow};
use toyframe_app::toy_app::{ToyApp, ToyAppDesc};
use toyframe_crate_tools::app_config::AppConfig;
use toyframe_crate_tools::toy_path::ToyPath;
use toyframe_render_graph::texture_upload::ImageCrateLoader;
use toyframe_renderer::shader_reload::{CommandShaderBuilder, ShaderReloader};

fn main() -> anyhow::Result<()> {
    toyframe_app::init_env();

    let mut args = std::env::args().skip(1);
    let demo_name = args.next().unwrap_or_else(|| "shader_toy".to_string());
    let frames = match args.next() {
        Some(frames) => frames.parse::<u64>().with_context(|| format!("帧数不是整数: {frames}"))?,
        None => 5,
    };

    let demo = demo_by_name(&demo_name)
        .with_context(|| format!("unknown demo {demo_name}, available: {}", DEMO_NAMES.join(", ")))?;
    let config = AppConfig::load_or_default(&ToyPath::config_path());

    let builder = CommandShaderBuilder::new(&config.shader_build_command, ToyPath::workspace_path())?;
    let desc = ToyAppDesc {
        window: HeadlessWindow::new(config.resolution, Some(frames)),
        surface: HeadlessSurface::new(config.frames_in_flight as u32),
        device: HeadlessDevice::default(),
        pipelines: HeadlessPipelines::new(demo.programs()),
        reloader: ShaderReloader::with_command(builder),
        demo,
    };

    let mut app = ToyApp::new(desc, &ImageCrateLoader, &config)?;
    app.run();

    let orchestrator = app.destroy();
    let submits = orchestrator
        .device()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DeviceCall::Submit {
                label,
                commands,
                draws,
                gated: true,
            } => Some(format!("{label}: {commands} commands, {draws} draws")),
            _ => None,
        })
        .collect_vec();
    for submit in &submits {
        log::info!("{submit}");
    }
    log::info!(
        "{demo_name}: presented {} of {frames} frames",
        orchestrator.surface().presented_count()
    );

    Ok(())
}
