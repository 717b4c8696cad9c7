//! 驱动配置
//!
//! 所有字段都有默认值，配置文件只需写出要覆盖的项：
//!
//! ```toml
//! stack_capacity = 256
//! handshake_timeout_ms = 1000
//!
//! [log]
//! level = "debug"
//! target = "local"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tux_protocol::DEFAULT_STACK_CAPACITY;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    /// 关闭日志
    None,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::None => "none",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "none" | "off" => Ok(LogLevel::None),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

/// 日志输出位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// 本地终端（stderr）
    #[default]
    Local,
    /// 驱动侧日志文件
    Hardware,
}

impl FromStr for LogTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(LogTarget::Local),
            "hardware" | "shell" => Ok(LogTarget::Hardware),
            other => Err(format!("unknown log target {other:?}")),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/tuxdroid/libtuxdriver.log")
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub target: LogTarget,
    /// `target = "hardware"` 时写入的文件
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            target: LogTarget::default(),
            file: default_log_file(),
        }
    }
}

/// 驱动配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 命令栈容量
    pub stack_capacity: usize,
    /// Start / ResetDongle 的握手超时（毫秒）
    pub handshake_timeout_ms: u64,
    /// Stop 等待 IO 线程退出的时间（毫秒）
    pub stop_grace_ms: u64,
    /// IO 线程空闲时的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 每个循环最多处理的上行帧数
    pub max_frames_per_cycle: usize,
    /// 链路无上报超过该时间视为连接异常（毫秒）
    pub link_timeout_ms: u64,
    pub log: LogConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            handshake_timeout_ms: 2000,
            stop_grace_ms: 500,
            poll_interval_ms: 10,
            max_frames_per_cycle: 32,
            link_timeout_ms: 3000,
            log: LogConfig::default(),
        }
    }
}

impl DriverConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// 轮询间隔，至少 1ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_millis(self.link_timeout_ms)
    }
}
