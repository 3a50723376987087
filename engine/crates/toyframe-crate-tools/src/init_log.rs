use std::io::Write;

/// 初始化全局 logger
///
/// 输出格式：`[HH:MM:SS] LEVEL [file:line] message`，默认级别为 Info，
/// 可以通过 `RUST_LOG` 覆盖。
///
/// 重复调用是安全的，第二次调用会被忽略。
pub fn init_log() {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            let level_style = match record.level() {
                log::Level::Info => buf
                    .default_level_style(log::Level::Info)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
                log::Level::Warn => buf
                    .default_level_style(log::Level::Warn)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
                log::Level::Error => buf
                    .default_level_style(log::Level::Error)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
                level => buf.default_level_style(level),
            };
            let location_style =
                anstyle::Style::new().fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));

            let file = record.file().map(short_file_name).unwrap_or("?");
            let line = record.line().unwrap_or(0);
            let time = chrono::Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "{level_style}[{time}] {:<5}{level_style:#} {location_style}[{file}:{line}]{location_style:#} {}",
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// 只保留文件名，兼容 windows 与 unix 的路径分隔符
fn short_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
