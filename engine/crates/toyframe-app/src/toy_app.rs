use toyframe_crate_tools::app_config::AppConfig;
use toyframe_gfx::device::GpuDevice;
use toyframe_platform::display_window::DisplayWindow;
use toyframe_platform::input_event::{KeyCode, MouseButton};
use toyframe_platform::input_state::ButtonState;
use toyframe_render_graph::frame_graph::FrameGraph;
use toyframe_render_graph::pipeline_provider::PipelineProvider;
use toyframe_render_graph::texture_upload::AssetLoader;
use toyframe_renderer::orchestrator::{FrameOrchestrator, FrameOutcome, FrameRequest};
use toyframe_renderer::present::PresentSurface;
use toyframe_renderer::render_context::RenderContext;
use toyframe_renderer::settings::FrameSettings;
use toyframe_renderer::shader_reload::ShaderReloader;

use crate::demos::{DemoInit, ToyDemo};

/// 主循环：poll 窗口事件 -> 处理输入 -> 更新 uniform -> 渲染一帧
pub struct ToyApp<W, S, D, P>
where
    W: DisplayWindow,
    S: PresentSurface,
    D: GpuDevice,
    P: PipelineProvider,
{
    window: W,
    orchestrator: FrameOrchestrator<S, D>,
    ctx: RenderContext,
    pipelines: P,
    reloader: ShaderReloader,

    demo: Box<dyn ToyDemo>,
    graph: FrameGraph,
}

/// 创建 `ToyApp` 需要的外部对象
pub struct ToyAppDesc<W, S, D, P> {
    pub window: W,
    pub surface: S,
    pub device: D,
    pub pipelines: P,
    pub reloader: ShaderReloader,
    pub demo: Box<dyn ToyDemo>,
}

// new & init
impl<W, S, D, P> ToyApp<W, S, D, P>
where
    W: DisplayWindow,
    S: PresentSurface,
    D: GpuDevice,
    P: PipelineProvider,
{
    pub fn new(desc: ToyAppDesc<W, S, D, P>, assets: &dyn AssetLoader, config: &AppConfig) -> anyhow::Result<Self> {
        let ToyAppDesc {
            window,
            mut surface,
            mut device,
            pipelines,
            reloader,
            mut demo,
        } = desc;

        for program in demo.programs() {
            anyhow::ensure!(
                pipelines.pipeline(program).is_some(),
                "demo {} 需要的 program {program} 没有对应的 pipeline",
                demo.name()
            );
        }

        let frame_settings = FrameSettings::from_config(config);
        let mut ctx = RenderContext::new(&mut device, frame_settings);

        // swapchain 可能无法使用请求的大小
        let extent = surface.rebuild(frame_settings.frame_extent, frame_settings.vsync);
        ctx.on_resized(extent);

        let graph = {
            let _span = toyframe_crate_tools::profile_scope!("ToyDemo::init");
            demo.init(&mut DemoInit {
                ctx: &mut ctx,
                device: &mut device,
                assets,
                config,
            })?
        };
        graph.print_execution_plan(&ctx.frame_bindings(0), &ctx.resources);

        let orchestrator = FrameOrchestrator::new(surface, device, ctx.frame_settings());
        log::info!(
            "{}: {}x{}, {} frames in flight",
            demo.name(),
            extent.width,
            extent.height,
            ctx.frame_settings().frames_in_flight
        );

        Ok(Self {
            window,
            orchestrator,
            ctx,
            pipelines,
            reloader,
            demo,
            graph,
        })
    }
}

// destroy
impl<W, S, D, P> ToyApp<W, S, D, P>
where
    W: DisplayWindow,
    S: PresentSurface,
    D: GpuDevice,
    P: PipelineProvider,
{
    /// 等待 GPU 空闲后释放资源，返回 orchestrator 以便检查最终状态
    pub fn destroy(self) -> FrameOrchestrator<S, D> {
        let Self {
            mut orchestrator, ctx, ..
        } = self;
        orchestrator.shutdown();
        ctx.destroy(orchestrator.device_mut());
        orchestrator
    }
}

// getters
impl<W, S, D, P> ToyApp<W, S, D, P>
where
    W: DisplayWindow,
    S: PresentSurface,
    D: GpuDevice,
    P: PipelineProvider,
{
    #[inline]
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    #[inline]
    pub fn orchestrator(&self) -> &FrameOrchestrator<S, D> {
        &self.orchestrator
    }

    #[inline]
    pub fn orchestrator_mut(&mut self) -> &mut FrameOrchestrator<S, D> {
        &mut self.orchestrator
    }

    #[inline]
    pub fn render_context(&self) -> &RenderContext {
        &self.ctx
    }

    #[inline]
    pub fn pipelines(&self) -> &P {
        &self.pipelines
    }

    #[inline]
    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }
}

// update
impl<W, S, D, P> ToyApp<W, S, D, P>
where
    W: DisplayWindow,
    S: PresentSurface,
    D: GpuDevice,
    P: PipelineProvider,
{
    /// 运行直到窗口被关闭
    pub fn run(&mut self) {
        while self.run_frame().is_some() {}
        self.orchestrator.shutdown();
    }

    /// 执行一次循环；窗口已经关闭时返回 `None`
    pub fn run_frame(&mut self) -> Option<FrameOutcome> {
        self.window.poll_events();
        if self.window.is_being_closed() {
            return None;
        }

        self.process_input();
        self.update();

        let outcome = self.orchestrator.tick(
            &mut self.ctx,
            FrameRequest {
                graph: &self.graph,
                pipelines: &self.pipelines,
                window_size: self.window.output_size(),
            },
        );
        if outcome == FrameOutcome::Skipped {
            log::trace!("frame skipped, window output size: {:?}", self.window.output_size());
        }
        Some(outcome)
    }

    fn process_input(&mut self) {
        let input = self.window.input();
        let close = input.key(KeyCode::Escape) == ButtonState::Falling;
        let reload = input.key(KeyCode::KeyB) == ButtonState::Falling;
        let pointer = input.mouse_button(MouseButton::Left);
        let cursor = input.get_mouse_position();

        if close {
            self.window.ask_to_close();
        }
        if reload {
            self.reloader.reload(self.orchestrator.device_mut(), &mut self.pipelines);
        }
        self.ctx.uniforms.params_mut().apply_pointer(pointer, cursor);
    }

    fn update(&mut self) {
        let time = self.window.time();
        let resolution = glam::UVec2::from(self.window.output_size());
        {
            let params = self.ctx.uniforms.params_mut();
            params.time = time;
            params.resolution = resolution;
        }

        self.demo.update(&mut self.ctx);
    }
}
