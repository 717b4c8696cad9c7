//! Builder 模式实现
//!
//! 提供链式构造 `TuxDriver` 实例的便捷方式。

use crate::config::{DriverConfig, LogLevel, LogTarget};
use crate::driver::TuxDriver;
use crate::pipeline::BoxedLink;
use std::path::PathBuf;
use std::time::Duration;
use tux_link::LinkAdapter;

/// TuxDriver Builder（链式构造）
///
/// 不设置链路时构造出的驱动运行在无硬件模式。
///
/// # Example
///
/// ```no_run
/// use tux_driver::TuxDriverBuilder;
/// use tux_link::SimulatedLink;
///
/// let driver = TuxDriverBuilder::new()
///     .link(SimulatedLink::new())
///     .stack_capacity(64)
///     .build();
/// driver.start().unwrap();
/// driver.push("open_mouth", 0.0).unwrap();
/// ```
#[derive(Default)]
pub struct TuxDriverBuilder {
    link: Option<BoxedLink>,
    config: DriverConfig,
}

impl TuxDriverBuilder {
    /// 创建新的 Builder（默认配置，无链路）
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置硬件链路
    pub fn link(mut self, link: impl LinkAdapter + Send + 'static) -> Self {
        self.link = Some(Box::new(link));
        self
    }

    /// 设置已装箱的硬件链路
    pub fn boxed_link(mut self, link: BoxedLink) -> Self {
        self.link = Some(link);
        self
    }

    /// 整体替换配置（例如从 TOML 文件加载的配置）
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tux_driver::{DriverConfig, TuxDriverBuilder};
    ///
    /// let config: DriverConfig = toml::from_str("stack_capacity = 16").unwrap();
    /// let driver = TuxDriverBuilder::new().config(config).build();
    /// assert_eq!(driver.stack_capacity(), 16);
    /// ```
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置命令栈容量（可选，默认 512）
    pub fn stack_capacity(mut self, capacity: usize) -> Self {
        self.config.stack_capacity = capacity;
        self
    }

    /// 设置握手超时（可选，默认 2s）
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_ms = duration_ms(timeout);
        self
    }

    /// 设置 stop 时等待 IO 线程退出的时间（可选，默认 500ms）
    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.config.stop_grace_ms = duration_ms(grace);
        self
    }

    /// 设置空闲时的轮询间隔（可选，默认 10ms）
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = duration_ms(interval);
        self
    }

    /// 设置无上报多久后判定链路失联（可选，默认 3s）
    pub fn link_timeout(mut self, timeout: Duration) -> Self {
        self.config.link_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log.level = level;
        self
    }

    pub fn log_target(mut self, target: LogTarget) -> Self {
        self.config.log.target = target;
        self
    }

    /// 设置 `Hardware` 输出时的日志文件
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log.file = path.into();
        self
    }

    /// 构建驱动（未启动）
    pub fn build(self) -> TuxDriver {
        TuxDriver::from_parts(self.link, self.config)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tux_link::SimulatedLink;

    #[test]
    fn test_builder_defaults() {
        let driver = TuxDriverBuilder::new().build();
        assert!(!driver.has_link());
        assert_eq!(driver.stack_capacity(), 512);
        assert_eq!(driver.config().log.level, LogLevel::Info);
    }

    #[test]
    fn test_builder_chain() {
        let driver = TuxDriverBuilder::new()
            .link(SimulatedLink::new())
            .stack_capacity(8)
            .handshake_timeout(Duration::from_millis(250))
            .poll_interval(Duration::from_millis(2))
            .log_level(LogLevel::Debug)
            .log_target(LogTarget::Hardware)
            .build();
        assert!(driver.has_link());
        assert_eq!(driver.stack_capacity(), 8);
        assert_eq!(driver.config().handshake_timeout(), Duration::from_millis(250));
        assert_eq!(driver.config().poll_interval(), Duration::from_millis(2));
        assert_eq!(driver.config().log.target, LogTarget::Hardware);
    }
}
