//! Headless 后端
//!
//! 不依赖窗口系统和 GPU：窗口事件按帧预先编排，device 的提交立即完成，
//! 所有调用都会被记录下来，便于检查帧循环的行为。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use ash::vk;
use ash::vk::Handle;
use slotmap::SlotMap;

use toyframe_gfx::command_recorder::CommandList;
use toyframe_gfx::device::GpuDevice;
use toyframe_gfx::handles::PipelineHandle;
use toyframe_gfx::resource_table::{GpuResource, NativeResource, ResourceKind, SamplerDesc};
use toyframe_gfx::sync::{CompletionSignal, ReadySignal};
use toyframe_platform::display_window::DisplayWindow;
use toyframe_platform::input_event::InputEvent;
use toyframe_platform::input_manager::InputManager;
use toyframe_platform::input_state::InputState;
use toyframe_render_graph::pipeline_provider::PipelineProvider;
use toyframe_render_graph::texture_upload::{AssetLoader, DecodedImage};
use toyframe_renderer::present::{AcquireOutcome, PresentSurface, PresentableImage};

/// 按帧编排输入事件的窗口
pub struct HeadlessWindow {
    input: InputManager,
    script: BTreeMap<u64, Vec<InputEvent>>,

    /// 已经 poll 过的次数
    polled: u64,
    /// poll 到这么多帧之后请求关闭
    frame_limit: Option<u64>,
    time_step: f32,
}

// new & init
impl HeadlessWindow {
    pub fn new(initial_size: [u32; 2], frame_limit: Option<u64>) -> Self {
        Self {
            input: InputManager::new(initial_size),
            script: BTreeMap::new(),
            polled: 0,
            frame_limit,
            time_step: 1.0 / 60.0,
        }
    }

    /// 在第 `frame` 次 poll（从 0 开始）时送入事件
    pub fn schedule(&mut self, frame: u64, event: InputEvent) -> &mut Self {
        self.script.entry(frame).or_default().push(event);
        self
    }
}

impl DisplayWindow for HeadlessWindow {
    fn poll_events(&mut self) {
        if self.frame_limit.is_some_and(|limit| self.polled >= limit) {
            self.input.request_close();
        }
        for event in self.script.remove(&self.polled).unwrap_or_default() {
            self.input.push_event(event);
        }
        self.input.process_events();
        self.polled += 1;
    }

    fn output_size(&self) -> [u32; 2] {
        self.input.output_size()
    }

    fn input(&self) -> &InputState {
        self.input.state()
    }

    fn time(&self) -> f32 {
        self.polled.saturating_sub(1) as f32 * self.time_step
    }

    fn is_being_closed(&self) -> bool {
        self.input.close_requested()
    }

    fn ask_to_close(&mut self) {
        log::info!("headless window asked to close");
        self.input.request_close();
    }
}

/// 在内存中轮转的 swapchain
pub struct HeadlessSurface {
    extent: vk::Extent2D,
    images: Vec<NativeResource>,
    next_image: usize,
    next_ready: u64,

    out_of_date: bool,
    /// 接下来这么多次 acquire 返回 TemporarilyUnavailable
    unavailable: u32,

    presented: u64,
    rebuilds: Vec<vk::Extent2D>,
}

// new & init
impl HeadlessSurface {
    pub fn new(image_count: u32) -> Self {
        let images = (0..image_count as u64)
            .map(|i| NativeResource::Image {
                image: vk::Image::from_raw(0x5000 + i),
                view: vk::ImageView::from_raw(0x5000 + i),
            })
            .collect();
        Self {
            extent: vk::Extent2D::default(),
            images,
            next_image: 0,
            next_ready: 0,
            out_of_date: false,
            unavailable: 0,
            presented: 0,
            rebuilds: Vec::new(),
        }
    }
}

// getters
impl HeadlessSurface {
    #[inline]
    pub fn presented_count(&self) -> u64 {
        self.presented
    }

    #[inline]
    pub fn rebuilds(&self) -> &[vk::Extent2D] {
        &self.rebuilds
    }
}

// update
impl HeadlessSurface {
    /// 之后的 acquire 和 present 都报告 out of date，直到重建
    pub fn mark_out_of_date(&mut self) {
        self.out_of_date = true;
    }

    pub fn make_unavailable(&mut self, acquires: u32) {
        self.unavailable = acquires;
    }
}

impl PresentSurface for HeadlessSurface {
    fn acquire_next(&mut self) -> AcquireOutcome {
        if self.unavailable > 0 {
            self.unavailable -= 1;
            return AcquireOutcome::TemporarilyUnavailable;
        }
        if self.out_of_date {
            return AcquireOutcome::OutOfDate;
        }

        let index = self.next_image;
        self.next_image = (self.next_image + 1) % self.images.len();
        self.next_ready += 1;
        AcquireOutcome::Acquired(PresentableImage {
            index: index as u32,
            native: self.images[index],
            ready: ReadySignal { id: self.next_ready },
        })
    }

    fn present(&mut self, image: &PresentableImage, completion: CompletionSignal) -> bool {
        if self.out_of_date {
            return false;
        }
        log::trace!("present image {} after {:?}", image.index, completion);
        self.presented += 1;
        true
    }

    fn rebuild(&mut self, desired: vk::Extent2D, vsync: bool) -> vk::Extent2D {
        log::info!("headless swapchain: {}x{}, vsync: {vsync}", desired.width, desired.height);
        self.extent = desired;
        self.out_of_date = false;
        self.next_image = 0;
        self.rebuilds.push(desired);
        desired
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceCall {
    Allocate(String),
    Release(String),
    ReleaseSampler(String),
    WriteHostBuffer(String),
    Submit {
        label: String,
        commands: usize,
        draws: usize,
        /// 是否等待 acquire 的图像
        gated: bool,
    },
    WaitFor(u64),
    WaitIdle,
}

/// 提交立即完成的 device，记录所有调用
#[derive(Default)]
pub struct HeadlessDevice {
    next_native: u64,
    timeline: u64,
    calls: Vec<DeviceCall>,

    last_submitted: Option<CommandList>,
    host_buffers: HashMap<String, Vec<u8>>,
}

// getters
impl HeadlessDevice {
    #[inline]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// 等待 acquire 图像的提交，也就是帧的提交
    pub fn frame_submits(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DeviceCall::Submit { gated: true, .. }))
            .count()
    }

    #[inline]
    pub fn last_submitted(&self) -> Option<&CommandList> {
        self.last_submitted.as_ref()
    }

    pub fn host_buffer(&self, name: &str) -> Option<&[u8]> {
        self.host_buffers.get(name).map(Vec::as_slice)
    }
}

// update
impl HeadlessDevice {
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn next_raw(&mut self) -> u64 {
        self.next_native += 1;
        self.next_native
    }
}

impl GpuDevice for HeadlessDevice {
    fn allocate(&mut self, name: &str, kind: &ResourceKind) -> NativeResource {
        self.calls.push(DeviceCall::Allocate(name.to_string()));
        let raw = self.next_raw();
        match kind {
            ResourceKind::Image(_) => NativeResource::Image {
                image: vk::Image::from_raw(raw),
                view: vk::ImageView::from_raw(raw),
            },
            ResourceKind::Buffer(_) => NativeResource::Buffer(vk::Buffer::from_raw(raw)),
        }
    }

    fn release(&mut self, name: &str, _native: NativeResource) {
        self.calls.push(DeviceCall::Release(name.to_string()));
        self.host_buffers.remove(name);
    }

    fn allocate_sampler(&mut self, _desc: &SamplerDesc) -> vk::Sampler {
        vk::Sampler::from_raw(self.next_raw())
    }

    fn release_sampler(&mut self, desc: &SamplerDesc) {
        self.calls.push(DeviceCall::ReleaseSampler(desc.name.clone()));
    }

    fn write_host_buffer(&mut self, buffer: &GpuResource, bytes: &[u8]) {
        assert!(
            bytes.len() as vk::DeviceSize <= buffer.buffer_desc().size,
            "write of {} bytes overflows buffer {}",
            bytes.len(),
            buffer.name
        );
        self.calls.push(DeviceCall::WriteHostBuffer(buffer.name.clone()));
        self.host_buffers.insert(buffer.name.clone(), bytes.to_vec());
    }

    fn submit(&mut self, commands: CommandList, wait: Option<ReadySignal>) -> CompletionSignal {
        self.timeline += 1;
        self.calls.push(DeviceCall::Submit {
            label: commands.label().to_string(),
            commands: commands.len(),
            draws: commands.draw_count(),
            gated: wait.is_some(),
        });
        self.last_submitted = Some(commands);
        CompletionSignal {
            timeline_value: self.timeline,
        }
    }

    fn wait_for(&mut self, signal: CompletionSignal) {
        assert!(signal.timeline_value <= self.timeline, "wait for a signal that was never submitted");
        self.calls.push(DeviceCall::WaitFor(signal.timeline_value));
    }

    fn wait_idle(&mut self) {
        self.calls.push(DeviceCall::WaitIdle);
    }
}

/// 每个 program 对应一个 pipeline 句柄，reload 后句柄全部更新
#[derive(Default)]
pub struct HeadlessPipelines {
    pipelines: SlotMap<PipelineHandle, String>,
    by_program: HashMap<String, PipelineHandle>,
    reload_count: usize,
}

impl HeadlessPipelines {
    pub fn new(programs: &[&str]) -> Self {
        let mut pipelines = Self::default();
        for program in programs {
            let handle = pipelines.pipelines.insert(program.to_string());
            pipelines.by_program.insert(program.to_string(), handle);
        }
        pipelines
    }

    #[inline]
    pub fn reload_count(&self) -> usize {
        self.reload_count
    }
}

impl PipelineProvider for HeadlessPipelines {
    fn pipeline(&self, program: &str) -> Option<PipelineHandle> {
        self.by_program.get(program).copied()
    }

    fn reload(&mut self) -> anyhow::Result<()> {
        let programs = self.pipelines.drain().map(|(_, program)| program).collect::<Vec<_>>();
        self.by_program.clear();
        for program in programs {
            let handle = self.pipelines.insert(program.clone());
            self.by_program.insert(program, handle);
        }
        self.reload_count += 1;
        Ok(())
    }
}

/// 不读文件，任何路径都返回一张纯色图片
pub struct SolidColorLoader {
    pub size: u32,
    pub rgba: [u8; 4],
}

impl Default for SolidColorLoader {
    fn default() -> Self {
        Self {
            size: 64,
            rgba: [128, 128, 128, 255],
        }
    }
}

impl AssetLoader for SolidColorLoader {
    fn load_rgba8(&self, path: &Path) -> anyhow::Result<DecodedImage> {
        log::debug!("solid color image for {}", path.display());
        Ok(DecodedImage::solid(self.size, self.size, self.rgba))
    }
}
