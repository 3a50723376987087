use ash::vk;
use toyframe_gfx::resource_table::NativeResource;
use toyframe_gfx::sync::{CompletionSignal, ReadySignal};

/// 从 swapchain 中获得的图像
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentableImage {
    pub index: u32,
    pub native: NativeResource,
    /// 图像可以写入时触发
    pub ready: ReadySignal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired(PresentableImage),
    /// 例如窗口最小化
    TemporarilyUnavailable,
    /// swapchain 与窗口不再匹配，需要重建
    OutOfDate,
}

/// 呈现表面（swapchain）的抽象
pub trait PresentSurface {
    fn acquire_next(&mut self) -> AcquireOutcome;

    /// 在 `completion` 之后呈现；返回 false 表示 swapchain 已经失效
    fn present(&mut self, image: &PresentableImage, completion: CompletionSignal) -> bool;

    /// 按照期望的大小重建，返回实际的大小
    fn rebuild(&mut self, desired: vk::Extent2D, vsync: bool) -> vk::Extent2D;

    fn extent(&self) -> vk::Extent2D;
}
