//! # Tux Protocol
//!
//! Tux Droid 驱动协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 状态通道 ID 常量定义
//! - `constants`: 协议常量（缓冲区上限、分隔符、哨兵值）
//! - `status`: 状态目录、类型化状态值、`name:type:value:delay` 记录的解析与格式化
//! - `instruction`: 指令词汇表（`TUX_CMD:<GROUP>:<ACTION>` / `RAW_CMD` / 简写动词）
//! - `frame`: 驱动与传输层之间交换的帧类型
//! - `error_code`: 稳定的错误码与 `describe()`
//!
//! ## 线格式
//!
//! 一条状态记录为 `name:type:value:delay`，`:` 分隔字段，`\n` 分隔记录。
//! 完整快照不超过 [`ALL_STATUS_BUFFER_LEN`] 字节，单通道查询不超过
//! [`STATUS_BUFFER_LEN`] 字节。

pub mod constants;
pub mod error_code;
pub mod frame;
pub mod ids;
pub mod instruction;
pub mod status;

// 重新导出常用类型
pub use constants::*;
pub use error_code::{ErrorCode, describe};
pub use frame::{LinkEvent, ReflashPlan, StatusFrame, TuxFrame};
pub use ids::*;
pub use instruction::{Instruction, Resource};
pub use status::*;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 状态 ID 超出目录范围
    #[error("Unknown status id: {0}")]
    UnknownId(i64),

    /// 状态名不在目录中
    #[error("Unknown status name: {0:?}")]
    UnknownName(String),

    /// 未知的值类型名
    #[error("Unknown value type: {0:?}")]
    UnknownType(String),

    /// 值无法按类型解析
    #[error("Invalid {value_type} value: {raw:?}")]
    InvalidValue { value_type: ValueType, raw: String },

    /// 记录字段数量或内容不合法
    #[error("Malformed status record: {0}")]
    MalformedRecord(String),

    /// 指令文本无法识别
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// 指令参数不合法
    #[error("Invalid parameter {index} for {command}: {raw:?}")]
    InvalidParameter {
        command: String,
        index: usize,
        raw: String,
    },
}
