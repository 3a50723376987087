//! 帧调度
//!
//! ```text
//! Idle -> AcquiringFrame -> Recording -> Submitted -> Presenting -> Idle
//!              |                                          |
//!              +------------> SwapchainStale <------------+
//!                                   |
//!                                   +--> Idle
//! ```

use ash::vk;

use toyframe_gfx::device::GpuDevice;
use toyframe_gfx::resource_state::ImageState;
use toyframe_render_graph::frame_graph::FrameGraph;
use toyframe_render_graph::pipeline_provider::PipelineProvider;

use crate::frame_counter::FrameCounter;
use crate::frame_slots::FrameSlots;
use crate::present::{AcquireOutcome, PresentSurface};
use crate::render_context::RenderContext;
use crate::settings::FrameSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    AcquiringFrame,
    Recording,
    Submitted,
    Presenting,
    SwapchainStale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// 没有图像可用，并且窗口大小为 0
    Skipped,
    /// swapchain 按新的大小重建
    Rebuilt(vk::Extent2D),
}

/// 一帧所需的输入
pub struct FrameRequest<'a> {
    pub graph: &'a FrameGraph,
    pub pipelines: &'a dyn PipelineProvider,
    /// 窗口当前的输出大小，最小化时为 `[0, 0]`
    pub window_size: [u32; 2],
}

pub struct FrameOrchestrator<S: PresentSurface, D: GpuDevice> {
    surface: S,
    device: D,
    slots: FrameSlots,
    counter: FrameCounter,
    vsync: bool,

    state: FrameState,
    /// 最近一次 tick 经过的状态
    transitions: Vec<FrameState>,
}

// new & init
impl<S: PresentSurface, D: GpuDevice> FrameOrchestrator<S, D> {
    pub fn new(surface: S, device: D, frame_settings: &FrameSettings) -> Self {
        Self {
            surface,
            device,
            slots: FrameSlots::new(frame_settings.frames_in_flight),
            counter: FrameCounter::new(frame_settings.frames_in_flight),
            vsync: frame_settings.vsync,
            state: FrameState::Idle,
            transitions: vec![FrameState::Idle],
        }
    }

    /// 等待所有提交完成，之后可以安全地销毁资源
    pub fn shutdown(&mut self) {
        self.device.wait_idle();
        self.slots.mark_all_complete();
        log::info!("frame orchestrator stopped after {} frames", self.counter.frame_id());
    }
}

// getters
impl<S: PresentSurface, D: GpuDevice> FrameOrchestrator<S, D> {
    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    #[inline]
    pub fn last_transitions(&self) -> &[FrameState] {
        &self.transitions
    }

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.counter.frame_id()
    }

    #[inline]
    pub fn current_slot(&self) -> usize {
        self.slots.current_index()
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

// 帧循环
impl<S: PresentSurface, D: GpuDevice> FrameOrchestrator<S, D> {
    fn enter(&mut self, state: FrameState) {
        log::trace!("{}: {:?} -> {:?}", self.counter.frame_name(), self.state, state);
        self.state = state;
        self.transitions.push(state);
    }

    /// 执行一帧：等待 slot、acquire、录制、提交、呈现
    pub fn tick(&mut self, ctx: &mut RenderContext, request: FrameRequest<'_>) -> FrameOutcome {
        let _span = toyframe_crate_tools::profile_scope!("FrameOrchestrator::tick");
        assert_eq!(self.state, FrameState::Idle, "tick is not reentrant");
        self.transitions.clear();
        self.transitions.push(FrameState::Idle);

        self.enter(FrameState::AcquiringFrame);
        self.slots.wait_current(&mut self.device);

        let image = match self.surface.acquire_next() {
            AcquireOutcome::Acquired(image) => image,
            AcquireOutcome::TemporarilyUnavailable => {
                log::debug!("{}: no presentable image available", self.counter.frame_name());
                return self.on_swapchain_stale(ctx, request.window_size);
            }
            AcquireOutcome::OutOfDate => {
                log::info!("{}: swapchain out of date on acquire", self.counter.frame_name());
                return self.on_swapchain_stale(ctx, request.window_size);
            }
        };

        self.enter(FrameState::Recording);
        let slot = self.slots.current_index();
        let backbuffer = ctx.backbuffer();
        ctx.resources.bind_native(backbuffer, image.native);
        ctx.resources.set_image_extent(backbuffer, self.surface.extent());
        // 新 acquire 的图像，旧内容不需要保留
        ctx.tracker.assume_state(backbuffer, ImageState::SWAPCHAIN_ACQUIRED);
        ctx.uniforms.write(slot, &ctx.resources, &mut self.device);

        let frame = ctx.frame_bindings(slot);
        let recorder = self.slots.current_mut().begin_recording(self.counter.frame_name());
        request
            .graph
            .record(&frame, &ctx.resources, &mut ctx.tracker, request.pipelines, recorder);
        let commands = self.slots.current_mut().finish();

        self.enter(FrameState::Submitted);
        let completion = self.device.submit(commands, Some(image.ready));
        self.slots.current_mut().mark_submitted(completion);
        self.slots.advance();
        self.counter.next_frame();

        self.enter(FrameState::Presenting);
        if !self.surface.present(&image, completion) {
            log::info!("swapchain out of date on present");
            return self.on_swapchain_stale(ctx, request.window_size);
        }

        toyframe_crate_tools::profile::frame_mark();
        self.enter(FrameState::Idle);
        FrameOutcome::Presented
    }

    /// 窗口大小不为 0 时按窗口大小重建 swapchain
    fn on_swapchain_stale(&mut self, ctx: &mut RenderContext, window_size: [u32; 2]) -> FrameOutcome {
        self.enter(FrameState::SwapchainStale);

        let outcome = if window_size[0] != 0 && window_size[1] != 0 {
            let desired = vk::Extent2D {
                width: window_size[0],
                height: window_size[1],
            };

            self.device.wait_idle();
            self.slots.mark_all_complete();
            let actual = self.surface.rebuild(desired, self.vsync);
            assert_eq!(
                actual, desired,
                "swapchain rebuilt with {actual:?}, but the window output size is {desired:?}"
            );
            ctx.on_resized(actual);
            log::info!("swapchain rebuilt: {}x{}", actual.width, actual.height);
            FrameOutcome::Rebuilt(actual)
        } else {
            FrameOutcome::Skipped
        };

        self.enter(FrameState::Idle);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use slotmap::SlotMap;
    use toyframe_gfx::command_recorder::{CommandList, GfxCommand};
    use toyframe_gfx::handles::PipelineHandle;
    use toyframe_gfx::resource_state::BufferState;
    use toyframe_gfx::resource_table::{GpuResource, NativeResource, ResourceKind, SamplerDesc};
    use toyframe_gfx::sync::{CompletionSignal, ReadySignal};
    use toyframe_render_graph::pass::{PassDesc, ResourceRef};

    use super::*;
    use crate::present::PresentableImage;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Event {
        Wait(u64),
        WaitIdle,
        Acquire,
        WriteBuffer(String),
        Submit { label: String, value: u64, waits_ready: bool },
        Present(u64),
        Rebuild(vk::Extent2D),
    }

    type EventLog = Rc<RefCell<Vec<Event>>>;

    struct MockDevice {
        log: EventLog,
        next_value: u64,
        submitted: Vec<CommandList>,
    }

    impl GpuDevice for MockDevice {
        fn allocate(&mut self, _name: &str, _kind: &ResourceKind) -> NativeResource {
            NativeResource::Unbound
        }

        fn release(&mut self, _name: &str, _native: NativeResource) {}

        fn allocate_sampler(&mut self, _desc: &SamplerDesc) -> vk::Sampler {
            vk::Sampler::null()
        }

        fn release_sampler(&mut self, _desc: &SamplerDesc) {}

        fn write_host_buffer(&mut self, buffer: &GpuResource, _bytes: &[u8]) {
            self.log.borrow_mut().push(Event::WriteBuffer(buffer.name.clone()));
        }

        fn submit(&mut self, commands: CommandList, wait: Option<ReadySignal>) -> CompletionSignal {
            self.next_value += 1;
            self.log.borrow_mut().push(Event::Submit {
                label: commands.label().to_string(),
                value: self.next_value,
                waits_ready: wait.is_some(),
            });
            self.submitted.push(commands);
            CompletionSignal {
                timeline_value: self.next_value,
            }
        }

        fn wait_for(&mut self, signal: CompletionSignal) {
            self.log.borrow_mut().push(Event::Wait(signal.timeline_value));
        }

        fn wait_idle(&mut self) {
            self.log.borrow_mut().push(Event::WaitIdle);
        }
    }

    struct MockSurface {
        log: EventLog,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<bool>,
        extent: vk::Extent2D,
        rebuild_result: Option<vk::Extent2D>,
        next_index: u32,
    }

    impl PresentSurface for MockSurface {
        fn acquire_next(&mut self) -> AcquireOutcome {
            self.log.borrow_mut().push(Event::Acquire);
            self.acquire_script.pop_front().unwrap_or_else(|| {
                let index = self.next_index;
                self.next_index = (self.next_index + 1) % 3;
                AcquireOutcome::Acquired(PresentableImage {
                    index,
                    native: NativeResource::Unbound,
                    ready: ReadySignal { id: index as u64 },
                })
            })
        }

        fn present(&mut self, _image: &PresentableImage, completion: CompletionSignal) -> bool {
            self.log.borrow_mut().push(Event::Present(completion.timeline_value));
            self.present_script.pop_front().unwrap_or(true)
        }

        fn rebuild(&mut self, desired: vk::Extent2D, _vsync: bool) -> vk::Extent2D {
            self.log.borrow_mut().push(Event::Rebuild(desired));
            self.extent = self.rebuild_result.unwrap_or(desired);
            self.extent
        }

        fn extent(&self) -> vk::Extent2D {
            self.extent
        }
    }

    struct Programs {
        handles: SlotMap<PipelineHandle, &'static str>,
    }

    impl PipelineProvider for Programs {
        fn pipeline(&self, program: &str) -> Option<PipelineHandle> {
            self.handles.iter().find(|(_, name)| **name == program).map(|(handle, _)| handle)
        }

        fn reload(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Harness {
        orchestrator: FrameOrchestrator<MockSurface, MockDevice>,
        ctx: RenderContext,
        graph: FrameGraph,
        programs: Programs,
        log: EventLog,
    }

    impl Harness {
        fn new(frames_in_flight: usize) -> Self {
            let log = EventLog::default();
            let settings = FrameSettings {
                frames_in_flight,
                ..Default::default()
            };
            let mut device = MockDevice {
                log: log.clone(),
                next_value: 0,
                submitted: vec![],
            };
            let ctx = RenderContext::new(&mut device, settings);
            let surface = MockSurface {
                log: log.clone(),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                extent: settings.frame_extent,
                rebuild_result: None,
                next_index: 0,
            };

            let mut graph = FrameGraph::new();
            graph
                .add_pass(
                    PassDesc::fullscreen("toy", "toy.frag")
                        .color_target(ResourceRef::Backbuffer, None)
                        .uniform(0, BufferState::UNIFORM_FRAGMENT),
                )
                .present_backbuffer();

            let mut handles = SlotMap::with_key();
            handles.insert("toy.frag");

            Self {
                orchestrator: FrameOrchestrator::new(surface, device, &settings),
                ctx,
                graph,
                programs: Programs { handles },
                log,
            }
        }

        fn tick(&mut self, window_size: [u32; 2]) -> FrameOutcome {
            self.orchestrator.tick(
                &mut self.ctx,
                FrameRequest {
                    graph: &self.graph,
                    pipelines: &self.programs,
                    window_size,
                },
            )
        }

        fn take_events(&self) -> Vec<Event> {
            std::mem::take(&mut *self.log.borrow_mut())
        }
    }

    #[test]
    fn test_presented_frame() {
        let mut harness = Harness::new(3);
        assert_eq!(harness.tick([1280, 720]), FrameOutcome::Presented);

        assert_eq!(
            harness.take_events(),
            vec![
                Event::Acquire,
                Event::WriteBuffer("frame-uniform-0".to_string()),
                Event::Submit {
                    label: "[F0A]".to_string(),
                    value: 1,
                    waits_ready: true
                },
                Event::Present(1),
            ]
        );
        assert_eq!(
            harness.orchestrator.last_transitions(),
            &[
                FrameState::Idle,
                FrameState::AcquiringFrame,
                FrameState::Recording,
                FrameState::Submitted,
                FrameState::Presenting,
                FrameState::Idle
            ]
        );
        assert_eq!(harness.orchestrator.current_slot(), 1);
    }

    #[test]
    fn test_submitted_commands_end_with_present_transition() {
        let mut harness = Harness::new(3);
        harness.tick([1280, 720]);

        let list = &harness.orchestrator.device().submitted[0];
        let first = list.barrier_batches().next().unwrap();
        let backbuffer = first.find_image(harness.ctx.backbuffer()).unwrap();
        assert_eq!(backbuffer.src_state, ImageState::SWAPCHAIN_ACQUIRED);
        assert_eq!(backbuffer.dst_state, ImageState::COLOR_ATTACHMENT_WRITE);
        assert_eq!(first.buffer_barriers.len(), 1);

        match list.commands().last() {
            Some(GfxCommand::PipelineBarrier(batch)) => {
                assert_eq!(batch.image_barriers[0].dst_state, ImageState::PRESENT);
            }
            other => panic!("unexpected last command: {other:?}"),
        }
    }

    #[test]
    fn test_slot_reuse_waits_for_previous_submission() {
        let mut harness = Harness::new(3);
        for _ in 0..3 {
            harness.tick([1280, 720]);
        }
        let first_frames = harness.take_events();
        assert!(!first_frames.iter().any(|event| matches!(event, Event::Wait(_))));

        // 第 4 帧回到 slot 0，必须先等待第 1 次提交
        harness.tick([1280, 720]);
        let events = harness.take_events();
        assert_eq!(events[0], Event::Wait(1));
        assert_eq!(events[1], Event::Acquire);
        assert!(events.contains(&Event::WriteBuffer("frame-uniform-0".to_string())));
        assert!(events.contains(&Event::Submit {
            label: "[F3A]".to_string(),
            value: 4,
            waits_ready: true
        }));

        harness.tick([1280, 720]);
        assert_eq!(harness.take_events()[0], Event::Wait(2));
    }

    #[test]
    fn test_unavailable_image_skips_frame() {
        let mut harness = Harness::new(3);
        harness
            .orchestrator
            .surface_mut()
            .acquire_script
            .push_back(AcquireOutcome::TemporarilyUnavailable);

        assert_eq!(harness.tick([0, 0]), FrameOutcome::Skipped);
        assert_eq!(harness.take_events(), vec![Event::Acquire]);
        assert!(harness.orchestrator.device().submitted.is_empty());
        assert_eq!(harness.orchestrator.state(), FrameState::Idle);
        assert_eq!(
            harness.orchestrator.last_transitions(),
            &[
                FrameState::Idle,
                FrameState::AcquiringFrame,
                FrameState::SwapchainStale,
                FrameState::Idle
            ]
        );
        // slot 没有被消耗
        assert_eq!(harness.orchestrator.current_slot(), 0);
        assert_eq!(harness.orchestrator.frame_id(), 0);
    }

    #[test]
    fn test_out_of_date_while_minimized() {
        let mut harness = Harness::new(3);
        harness
            .orchestrator
            .surface_mut()
            .acquire_script
            .push_back(AcquireOutcome::OutOfDate);

        assert_eq!(harness.tick([0, 0]), FrameOutcome::Skipped);
        let events = harness.take_events();
        assert!(!events.iter().any(|event| matches!(event, Event::Rebuild(_))));
        assert!(!events.contains(&Event::WaitIdle));
    }

    #[test]
    fn test_out_of_date_rebuilds_with_window_size() {
        let mut harness = Harness::new(3);
        harness
            .orchestrator
            .surface_mut()
            .acquire_script
            .push_back(AcquireOutcome::OutOfDate);

        let expected = vk::Extent2D {
            width: 800,
            height: 600,
        };
        assert_eq!(harness.tick([800, 600]), FrameOutcome::Rebuilt(expected));
        assert_eq!(
            harness.take_events(),
            vec![Event::Acquire, Event::WaitIdle, Event::Rebuild(expected)]
        );
        assert_eq!(harness.orchestrator.state(), FrameState::Idle);
        assert_eq!(
            harness.ctx.resources.image_desc(harness.ctx.backbuffer()).extent,
            expected
        );
        assert_eq!(harness.ctx.frame_settings().frame_extent, expected);

        // 下一帧正常呈现
        assert_eq!(harness.tick([800, 600]), FrameOutcome::Presented);
    }

    #[test]
    fn test_present_failure_rebuilds() {
        let mut harness = Harness::new(2);
        harness.orchestrator.surface_mut().present_script.push_back(false);

        let expected = vk::Extent2D {
            width: 640,
            height: 480,
        };
        assert_eq!(harness.tick([640, 480]), FrameOutcome::Rebuilt(expected));
        let events = harness.take_events();
        assert_eq!(&events[events.len() - 3..], &[Event::Present(1), Event::WaitIdle, Event::Rebuild(expected)]);
        assert_eq!(
            harness.orchestrator.last_transitions(),
            &[
                FrameState::Idle,
                FrameState::AcquiringFrame,
                FrameState::Recording,
                FrameState::Submitted,
                FrameState::Presenting,
                FrameState::SwapchainStale,
                FrameState::Idle
            ]
        );

        // 设备空闲之后 slot 不需要再等待
        harness.tick([640, 480]);
        harness.tick([640, 480]);
        assert!(!harness.take_events().iter().any(|event| matches!(event, Event::Wait(_))));
    }

    #[test]
    fn test_present_out_of_date_while_minimized() {
        let mut harness = Harness::new(3);
        harness.orchestrator.surface_mut().present_script.push_back(false);

        assert_eq!(harness.tick([0, 0]), FrameOutcome::Skipped);
        let events = harness.take_events();
        assert_eq!(events.last(), Some(&Event::Present(1)));
        assert!(!events.iter().any(|event| matches!(event, Event::Rebuild(_))));
        assert!(!events.contains(&Event::WaitIdle));
        assert_eq!(
            harness.orchestrator.last_transitions(),
            &[
                FrameState::Idle,
                FrameState::AcquiringFrame,
                FrameState::Recording,
                FrameState::Submitted,
                FrameState::Presenting,
                FrameState::SwapchainStale,
                FrameState::Idle
            ]
        );
    }

    #[test]
    #[should_panic(expected = "swapchain rebuilt with")]
    fn test_rebuild_size_mismatch_is_fatal() {
        let mut harness = Harness::new(3);
        let surface = harness.orchestrator.surface_mut();
        surface.acquire_script.push_back(AcquireOutcome::OutOfDate);
        surface.rebuild_result = Some(vk::Extent2D {
            width: 799,
            height: 600,
        });
        harness.tick([800, 600]);
    }

    #[test]
    fn test_shutdown_waits_idle() {
        let mut harness = Harness::new(3);
        harness.tick([1280, 720]);
        harness.take_events();
        harness.orchestrator.shutdown();
        assert_eq!(harness.take_events(), vec![Event::WaitIdle]);
    }
}
