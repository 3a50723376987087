pub mod demos;
pub mod headless;
pub mod toy_app;

use toyframe_crate_tools::init_log::init_log;

pub fn panic_handler(info: &std::panic::PanicHookInfo) {
    log::error!("{}", info);
}

/// 进程级初始化：panic hook、日志、tracy
pub fn init_env() {
    std::panic::set_hook(Box::new(panic_handler));

    init_log();

    toyframe_crate_tools::profile::start_profiler();
    tracy_client::set_thread_name!("RenderThread");
}
