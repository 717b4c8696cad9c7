//! 驱动层错误类型定义

use std::path::PathBuf;
use thiserror::Error;
use tux_link::LinkError;
use tux_protocol::{ErrorCode, ProtocolError, Resource};

/// 驱动层错误类型
///
/// 每个变体都映射到一个稳定错误码，见 [`DriverError::code`]。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 没有建立硬件链路，命令解析器处于禁用状态
    #[error("Command parser is disabled (no hardware link)")]
    ParserDisabled,

    /// 没有硬件链路
    #[error("Dongle link unavailable")]
    LinkUnavailable,

    /// 指令文本无法识别
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// 状态 ID 不在目录范围内
    #[error("Invalid status identifier: {0}")]
    InvalidIdentifier(i64),

    /// 状态名不在目录中
    #[error("Invalid status name: {0:?}")]
    InvalidName(String),

    /// 参数不合法（延迟、指令参数等）
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 命令栈已满
    #[error("Command stack full (capacity: {capacity})")]
    StackOverflow { capacity: usize },

    /// 独占资源正被占用
    #[error("{0} is busy")]
    Busy(Resource),

    /// 宏文本在某一行解析失败
    #[error("Macro parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// 文件缺失或不可读
    #[error("File error for {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 文件内容格式不正确（例如不是 WAV）
    #[error("Bad format: {0}")]
    BadFormat(String),

    /// 声音闪存容量不足
    #[error("Selection needs {blocks} blocks, limit is {limit}")]
    SizeExceeded { blocks: u32, limit: u32 },

    /// 硬件握手或复位超时
    #[error("Operation timeout: {0}")]
    Timeout(&'static str),

    /// 链路层错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

impl DriverError {
    /// 稳定错误码
    pub fn error_code(&self) -> ErrorCode {
        match self {
            DriverError::ParserDisabled => ErrorCode::ParserDisabled,
            DriverError::LinkUnavailable | DriverError::Link(_) | DriverError::IoThread(_) => {
                ErrorCode::LinkUnavailable
            },
            DriverError::InvalidCommand(_) | DriverError::Parse { .. } => ErrorCode::InvalidCommand,
            DriverError::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            DriverError::InvalidName(_) => ErrorCode::InvalidName,
            DriverError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            DriverError::StackOverflow { .. } => ErrorCode::StackOverflow,
            DriverError::Busy(_) => ErrorCode::Busy,
            DriverError::File { .. } => ErrorCode::FileError,
            DriverError::BadFormat(_) => ErrorCode::BadFormat,
            DriverError::SizeExceeded { .. } => ErrorCode::SizeExceeded,
            DriverError::Timeout(_) => ErrorCode::Timeout,
        }
    }

    /// 稳定错误码的整数值
    pub fn code(&self) -> i32 {
        self.error_code().code()
    }
}

impl From<ProtocolError> for DriverError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownId(id) => DriverError::InvalidIdentifier(id),
            ProtocolError::UnknownName(name) => DriverError::InvalidName(name),
            ProtocolError::InvalidCommand(text) => DriverError::InvalidCommand(text),
            other @ (ProtocolError::InvalidParameter { .. }
            | ProtocolError::InvalidValue { .. }
            | ProtocolError::UnknownType(_)
            | ProtocolError::MalformedRecord(_)) => DriverError::InvalidParameter(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        assert_eq!(
            DriverError::StackOverflow { capacity: 512 }.to_string(),
            "Command stack full (capacity: 512)"
        );
        assert_eq!(
            DriverError::Busy(Resource::SoundChannel).to_string(),
            "sound channel is busy"
        );
        let msg = DriverError::Parse {
            line: 3,
            reason: "unknown instruction".into(),
        }
        .to_string();
        assert!(msg.contains("line 3") && msg.contains("unknown instruction"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DriverError::ParserDisabled.code(), 256);
        assert_eq!(DriverError::InvalidCommand("x".into()).code(), 257);
        assert_eq!(DriverError::StackOverflow { capacity: 1 }.code(), 258);
        assert_eq!(DriverError::InvalidIdentifier(99).code(), 261);
        assert_eq!(DriverError::InvalidName("x".into()).code(), 262);
        assert_eq!(DriverError::Busy(Resource::FlashProgramming).code(), 264);
        assert_eq!(DriverError::LinkUnavailable.code(), 266);
        assert_eq!(DriverError::Timeout("start").code(), 267);
    }

    #[test]
    fn test_from_protocol_error() {
        let err: DriverError = ProtocolError::UnknownName("foo".into()).into();
        assert!(matches!(err, DriverError::InvalidName(name) if name == "foo"));

        let err: DriverError = ProtocolError::UnknownId(-1).into();
        assert!(matches!(err, DriverError::InvalidIdentifier(-1)));

        let err: DriverError = ProtocolError::InvalidParameter {
            command: "TUX_CMD:EYES:ON:x,OPEN".into(),
            index: 0,
            raw: "x".into(),
        }
        .into();
        assert_eq!(err.code(), 263);
    }

    #[test]
    fn test_from_link_error() {
        let err: DriverError = LinkError::Timeout.into();
        assert!(matches!(err, DriverError::Link(LinkError::Timeout)));
    }
}
