//! 日志初始化
//!
//! 把启动时的两个设置映射到 `tracing-subscriber`：
//!
//! - 级别：`LogLevel` → `LevelFilter`，`RUST_LOG` 可以覆盖
//! - 输出：`Local` 写 stderr，`Hardware` 通过 `tracing-appender` 非阻塞写入日志文件
//!
//! 全局订阅者只能安装一次，重复安装被忽略，因此 `start()` 可以多次调用。

use crate::config::{LogConfig, LogLevel, LogTarget};
use std::path::Path;
use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// 日志级别对应的过滤器
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warning => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::None => LevelFilter::OFF,
    }
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level_filter(level).into())
        .from_env_lossy()
}

/// 安装全局日志订阅者
///
/// 返回值：`Hardware` 输出时返回写线程的 guard，调用方需要持有它直到退出，
/// 否则缓冲中的日志可能丢失；其余情况返回 `None`。
///
/// 已经安装过订阅者时不做任何事。
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let filter = env_filter(config.level);
    let (installed, guard) = match config.target {
        LogTarget::Local => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr));
            (tracing::subscriber::set_global_default(subscriber).is_ok(), None)
        },
        LogTarget::Hardware => {
            let Some((dir, name)) = split_log_path(&config.file) else {
                eprintln!("Invalid log file path {:?}, logging disabled", config.file);
                return None;
            };
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Cannot create log directory {dir:?}: {e}, logging disabled");
                return None;
            }
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer));
            let installed = tracing::subscriber::set_global_default(subscriber).is_ok();
            (installed, installed.then_some(guard))
        },
    };

    if installed {
        // 依赖库通过 `log` 输出的记录
        let _ = tracing_log::LogTracer::init();
        debug!(
            "Logging initialized (level: {}, target: {:?})",
            config.level, config.target
        );
    } else {
        debug!("Global subscriber already installed, keeping it");
    }
    guard
}

fn split_log_path(path: &Path) -> Option<(&Path, &std::ffi::OsStr)> {
    let name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Some((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_level_filter_mapping() {
        assert_eq!(level_filter(LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(level_filter(LogLevel::Warning), LevelFilter::WARN);
        assert_eq!(level_filter(LogLevel::None), LevelFilter::OFF);
    }

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/tuxdroid/libtuxdriver.log")).unwrap();
        assert_eq!(dir, Path::new("/var/log/tuxdroid"));
        assert_eq!(name, "libtuxdriver.log");

        let (dir, _) = split_log_path(Path::new("driver.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert!(split_log_path(Path::new("/")).is_none());
    }

    #[test]
    #[serial]
    fn test_second_init_is_ignored() {
        let config = LogConfig::default();
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_none());
    }
}
