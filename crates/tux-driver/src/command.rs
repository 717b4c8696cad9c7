//! 命令类型定义模块
//!
//! 一条命令 = 一条已解析的指令 + 最小间隔延迟。

use crate::error::DriverError;
use std::fmt;
use std::time::Duration;
use tux_protocol::{Instruction, Resource};

/// 排队等待执行的命令
///
/// `delay` 是最小命令间隔：从上一条命令执行完成算起，至少等待这么久才执行本条。
/// 这不是绝对调度时刻，执行耗时带来的累计漂移是允许的。
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    instruction: Instruction,
    delay: Duration,
}

impl Command {
    /// 由已解析的指令和延迟（秒）创建
    ///
    /// # 错误
    ///
    /// 延迟为负数、NaN 或无穷大时返回 `DriverError::InvalidParameter`。
    pub fn new(instruction: Instruction, delay_secs: f64) -> Result<Self, DriverError> {
        let delay = Duration::try_from_secs_f64(delay_secs)
            .map_err(|_| DriverError::InvalidParameter(format!("invalid delay {delay_secs}")))?;
        Ok(Self { instruction, delay })
    }

    /// 解析指令文本并创建
    ///
    /// # 错误
    ///
    /// - 指令无法识别：`DriverError::InvalidCommand`
    /// - 参数或延迟非法：`DriverError::InvalidParameter`
    pub fn parse(text: &str, delay_secs: f64) -> Result<Self, DriverError> {
        let instruction = Instruction::parse(text)?;
        Self::new(instruction, delay_secs)
    }

    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn delay_secs(&self) -> f64 {
        self.delay.as_secs_f64()
    }

    /// 执行需要独占的资源
    pub fn resource(&self) -> Option<Resource> {
        self.instruction.resource()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{:.3}s)", self.instruction, self.delay_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let cmd = Command::parse("open_mouth", 1.5).unwrap();
        assert_eq!(cmd.delay(), Duration::from_millis(1500));
        assert_eq!(cmd.instruction().to_string(), "TUX_CMD:MOUTH:OPEN");
        assert_eq!(cmd.resource(), None);
    }

    #[test]
    fn test_rejects_bad_delay() {
        for delay in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Command::parse("open_mouth", delay),
                Err(DriverError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_rejects_unknown_instruction() {
        assert!(matches!(
            Command::parse("wiggle_ears", 0.0),
            Err(DriverError::InvalidCommand(_))
        ));
    }
}
