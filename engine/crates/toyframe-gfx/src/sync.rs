//! GPU 同步信号的抽象
//!
//! 具体的 semaphore / fence 由 `GpuDevice` 与 `PresentSurface` 的实现管理，
//! 这里只保留可以比较、可以记录的值。

/// 呈现图像已经可以写入的信号，对应 acquire 时的 binary semaphore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadySignal {
    pub id: u64,
}

/// 一次 submit 在 GPU 上执行完成的信号
///
/// 对应 timeline semaphore 上的一个值，值越大提交越晚
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompletionSignal {
    pub timeline_value: u64,
}
