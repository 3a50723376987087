//! tracy 性能分析的辅助工具
//!
//! 只有在 tracy client 已经启动时才会创建 span，
//! 否则 `tracy_client::span!` 会因为没有 client 而 panic。

/// 创建一个 tracy span，返回 `Option<tracy_client::Span>`
///
/// 名字必须是字面量；当 tracy client 没有运行时返回 `None`。
///
/// ```ignore
/// let _span = toyframe_crate_tools::profile_scope!("FrameGraph::record");
/// ```
#[macro_export]
macro_rules! profile_scope {
    ($name:literal) => {
        $crate::__tracy::Client::running()
            .map(|client| client.span($crate::__tracy::span_location!($name), 0))
    };
}

/// 标记一帧结束
pub fn frame_mark() {
    if let Some(client) = tracy_client::Client::running() {
        client.frame_mark();
    }
}

/// 启动 tracy client，之后的 `profile_scope!` 才会生效
pub fn start_profiler() {
    let _client = tracy_client::Client::start();
    log::info!("tracy client started");
}
