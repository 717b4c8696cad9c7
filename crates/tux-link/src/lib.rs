//! # Tux Link Layer
//!
//! dongle 链路抽象层，提供统一的传输接口抽象。
//!
//! 驱动只依赖 [`LinkAdapter`] trait：握手、发送下行帧、轮询上行事件、复位。
//! 帧的字节编码由具体适配器负责。[`SimulatedLink`] 是进程内的 dongle + 机器人模拟器，
//! 用于测试和命令行演示。

use std::time::Duration;
use thiserror::Error;

// 重新导出 tux-protocol 中的帧类型
pub use tux_protocol::{LinkEvent, ReflashPlan, StatusFrame, TuxFrame};

pub mod sim;

pub use sim::{SimHandle, SimulatedLink};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// 硬件未在期限内应答（发送 ACK 或握手）
    #[error("Link timeout")]
    Timeout,
    /// dongle 不存在或已拔出
    #[error("Dongle disconnected")]
    Disconnected,
    /// 握手被硬件拒绝
    #[error("Handshake failed: {0}")]
    Handshake(String),
    #[error("Device error: {0}")]
    Device(String),
}

impl LinkError {
    /// 是否为致命错误（需要重新握手才能继续）
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::Disconnected | LinkError::Handshake(_))
    }
}

/// dongle 链路适配器
///
/// 所有方法都在驱动的 IO 线程上调用，实现无需线程安全，
/// 但必须是 `Send`（在启动时被移动到 IO 线程）。
pub trait LinkAdapter {
    /// 与硬件握手，在 `timeout` 内未完成返回 `LinkError::Timeout`
    fn handshake(&mut self, timeout: Duration) -> Result<(), LinkError>;

    /// 发送一帧并等待硬件 ACK
    ///
    /// 未应答返回 `LinkError::Timeout`。
    fn send(&mut self, frame: TuxFrame) -> Result<(), LinkError>;

    /// 非阻塞轮询一条上行事件，没有数据返回 `Ok(None)`
    fn poll(&mut self) -> Result<Option<LinkEvent>, LinkError>;

    /// 逻辑复位链路并重新握手
    fn reset(&mut self, timeout: Duration) -> Result<(), LinkError> {
        self.handshake(timeout)
    }
}

impl<T: LinkAdapter + ?Sized> LinkAdapter for Box<T> {
    fn handshake(&mut self, timeout: Duration) -> Result<(), LinkError> {
        (**self).handshake(timeout)
    }

    fn send(&mut self, frame: TuxFrame) -> Result<(), LinkError> {
        (**self).send(frame)
    }

    fn poll(&mut self) -> Result<Option<LinkEvent>, LinkError> {
        (**self).poll()
    }

    fn reset(&mut self, timeout: Duration) -> Result<(), LinkError> {
        (**self).reset(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentLink;

    impl LinkAdapter for SilentLink {
        fn handshake(&mut self, _timeout: Duration) -> Result<(), LinkError> {
            Ok(())
        }

        fn send(&mut self, _frame: TuxFrame) -> Result<(), LinkError> {
            Err(LinkError::Timeout)
        }

        fn poll(&mut self) -> Result<Option<LinkEvent>, LinkError> {
            Ok(None)
        }
    }

    #[test]
    fn test_default_reset_handshakes() {
        let mut link: Box<dyn LinkAdapter + Send> = Box::new(SilentLink);
        assert!(link.reset(Duration::from_millis(1)).is_ok());
        assert!(link.poll().unwrap().is_none());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(LinkError::Timeout.to_string(), "Link timeout");
        assert!(LinkError::Handshake("nack".into()).to_string().contains("nack"));
        assert!(LinkError::Disconnected.is_fatal());
        assert!(!LinkError::Timeout.is_fatal());
    }
}
