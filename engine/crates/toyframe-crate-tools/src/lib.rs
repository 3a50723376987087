pub mod app_config;
pub mod init_log;
pub mod profile;
pub mod toy_path;

#[doc(hidden)]
pub use tracy_client as __tracy;
