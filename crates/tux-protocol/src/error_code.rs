//! 对外错误码
//!
//! 错误码是稳定的小整数，上层绑定（例如 FFI 封装）直接透传。
//! 除 `NoError` 外，所有错误码从 256 开始编号。

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 错误码起始值
pub const ERROR_BASE: i32 = 256;

/// 稳定错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ErrorCode {
    NoError = 0,
    ParserDisabled = 256,
    InvalidCommand = 257,
    StackOverflow = 258,
    FileError = 259,
    BadFormat = 260,
    InvalidIdentifier = 261,
    InvalidName = 262,
    InvalidParameter = 263,
    Busy = 264,
    SizeExceeded = 265,
    LinkUnavailable = 266,
    Timeout = 267,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self.into()
    }

    /// 人类可读的描述
    pub const fn description(self) -> &'static str {
        match self {
            ErrorCode::NoError => "No error",
            ErrorCode::ParserDisabled => "The parser of command is disabled",
            ErrorCode::InvalidCommand => "Invalid command",
            ErrorCode::StackOverflow => "The stack of commands is full",
            ErrorCode::FileError => "File error",
            ErrorCode::BadFormat => "Wave file error",
            ErrorCode::InvalidIdentifier => "The identifier is unknown",
            ErrorCode::InvalidName => "The name is unknown",
            ErrorCode::InvalidParameter => "One or more parameters are invalid",
            ErrorCode::Busy => "The system is busy",
            ErrorCode::SizeExceeded => "The size of the selection exceeds 127 blocks",
            ErrorCode::LinkUnavailable => "The dongle is not connected",
            ErrorCode::Timeout => "The hardware did not answer in time",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// 错误码 → 描述，未知错误码返回 `"Unknown error"`
pub fn describe(code: i32) -> &'static str {
    ErrorCode::try_from(code)
        .map(ErrorCode::description)
        .unwrap_or("Unknown error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::NoError.code(), 0);
        assert_eq!(ErrorCode::ParserDisabled.code(), ERROR_BASE);
        assert_eq!(ErrorCode::StackOverflow.code(), 258);
        assert_eq!(ErrorCode::Busy.code(), 264);
        assert_eq!(ErrorCode::SizeExceeded.code(), 265);
        assert_eq!(ErrorCode::Timeout.code(), 267);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(0), "No error");
        assert_eq!(describe(257), "Invalid command");
        assert_eq!(describe(1), "Unknown error");
        assert_eq!(describe(-1), "Unknown error");
        assert_eq!(describe(9999), "Unknown error");
    }

    #[test]
    fn test_round_trip_through_integer() {
        for raw in [0, 256, 257, 258, 259, 260, 261, 262, 263, 264, 265, 266, 267] {
            let code = ErrorCode::try_from(raw).unwrap();
            assert_eq!(code.code(), raw);
        }
    }
}
