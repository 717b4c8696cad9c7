//! 状态目录与状态记录
//!
//! 本模块定义：
//! - [`ValueType`] / [`Value`]：通道值的类型与类型化负载
//! - [`ChannelState`]：值的有效性状态（unknown/fresh/stale/error）
//! - [`CATALOG`]：41 个状态通道的只读目录（ID ↔ 名称 ↔ 类型）
//! - [`StatusRecord`]：`name:type:value:delay` 线格式的纯函数解析与格式化
//!
//! 这里的所有函数都不依赖硬件，适合穷举式单元测试。

use crate::ProtocolError;
use crate::constants::*;
use crate::ids::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use smallvec::SmallVec;
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// 状态值类型
///
/// 每个通道的类型在进程生命周期内固定不变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ValueType {
    UInt8 = 0,
    Int8 = 1,
    Int = 2,
    Float = 3,
    Bool = 4,
    /// 字符串，线格式名为 `string`
    Text = 5,
}

impl ValueType {
    /// 线格式中的类型名
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::UInt8 => "uint8",
            ValueType::Int8 => "int8",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Text => "string",
        }
    }

    /// 是否为数值类型（参与事件阈值比较）
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::UInt8 | ValueType::Int8 | ValueType::Int | ValueType::Float
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uint8" => Ok(ValueType::UInt8),
            "int8" => Ok(ValueType::Int8),
            "int" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "bool" => Ok(ValueType::Bool),
            "string" => Ok(ValueType::Text),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

/// 类型化的状态值
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    UInt8(u8),
    Int8(i8),
    Int(i32),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// 值的运行时类型
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::UInt8(_) => ValueType::UInt8,
            Value::Int8(_) => ValueType::Int8,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::Text(_) => ValueType::Text,
        }
    }

    /// 按类型显式解析原始文本
    ///
    /// - 数值类型：十进制解析，浮点数拒绝 NaN/无穷大
    /// - bool：`true`/`false`（不区分大小写）
    /// - string：原样保留，但不允许包含字段或记录分隔符
    ///
    /// # 错误
    ///
    /// 解析失败返回 `ProtocolError::InvalidValue`。
    pub fn parse(value_type: ValueType, raw: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidValue {
            value_type,
            raw: raw.to_string(),
        };
        let trimmed = raw.trim();
        match value_type {
            ValueType::UInt8 => trimmed.parse().map(Value::UInt8).map_err(|_| invalid()),
            ValueType::Int8 => trimmed.parse().map(Value::Int8).map_err(|_| invalid()),
            ValueType::Int => trimmed.parse().map(Value::Int).map_err(|_| invalid()),
            ValueType::Float => match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Value::Float(v)),
                _ => Err(invalid()),
            },
            ValueType::Bool => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(invalid())
                }
            },
            ValueType::Text => {
                if raw.contains([FIELD_SEPARATOR, RECORD_SEPARATOR, '\r']) {
                    Err(invalid())
                } else {
                    Ok(Value::Text(raw.to_string()))
                }
            },
        }
    }

    /// 数值视图（bool 与字符串返回 `None`）
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::UInt8(v) => Some(f64::from(v)),
            Value::Int8(v) => Some(f64::from(v)),
            Value::Int(v) => Some(f64::from(v)),
            Value::Float(v) => Some(v),
            Value::Bool(_) | Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::UInt8(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.6}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// 判断新值相对上次上报的值是否需要产生事件
///
/// 首次取值总是上报；数值类型在 `|Δ| >= threshold` 时上报；
/// bool/字符串在值变化时上报。
pub fn should_report(previous: Option<&Value>, current: &Value, threshold: f64) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    match (previous.as_f64(), current.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() >= threshold,
        _ => previous != current,
    }
}

/// 通道值的有效性状态
///
/// 硬件以字符串形式上报，未识别的字符串按 `Unknown` 处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelState {
    /// 尚未收到任何上报
    #[default]
    Unknown,
    /// 最近一次上报有效
    Fresh,
    /// 链路复位或静默，值可能已过期
    Stale,
    /// 硬件报告该通道出错
    Error,
}

impl ChannelState {
    /// 从硬件上报的状态字符串解析（不区分大小写）
    pub fn from_wire(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("fresh") || raw.eq_ignore_ascii_case("ok") {
            ChannelState::Fresh
        } else if raw.eq_ignore_ascii_case("stale") {
            ChannelState::Stale
        } else if raw.eq_ignore_ascii_case("error") {
            ChannelState::Error
        } else {
            ChannelState::Unknown
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelState::Unknown => "unknown",
            ChannelState::Fresh => "fresh",
            ChannelState::Stale => "stale",
            ChannelState::Error => "error",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 目录中的一个状态通道
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusEntry {
    pub id: StatusId,
    pub name: &'static str,
    pub value_type: ValueType,
    /// 可能取值的说明（用于文档导出）
    pub value_doc: &'static str,
    /// 数值通道的事件阈值（值单位）
    pub event_threshold: f64,
}

const fn entry(
    id: StatusId,
    name: &'static str,
    value_type: ValueType,
    value_doc: &'static str,
) -> StatusEntry {
    StatusEntry {
        id,
        name,
        value_type,
        value_doc,
        event_threshold: 1.0,
    }
}

use ValueType::{Bool, Float, Int, Text, UInt8};

/// 状态通道目录（下标即 ID）
pub static CATALOG: [StatusEntry; STATUS_COUNT] = [
    entry(FLIPPERS_POSITION, "flippers_position", Text, "DOWN|UP"),
    entry(FLIPPERS_REMAINING_MVM, "flippers_remaining_movements", UInt8, "range[0..255]"),
    entry(SPINNING_DIRECTION, "spinning_direction", Text, "NONE|LEFT|RIGHT"),
    entry(SPINNING_REMAINING_MVM, "spinning_remaining_movements", UInt8, "range[0..255]"),
    entry(LEFT_WING_BUTTON, "left_wing_button", Bool, "False|True"),
    entry(RIGHT_WING_BUTTON, "right_wing_button", Bool, "False|True"),
    entry(HEAD_BUTTON, "head_button", Bool, "False|True"),
    entry(REMOTE_BUTTON, "remote_button", Text, "K_<remote button>|RELEASE"),
    entry(MOUTH_POSITION, "mouth_position", Text, "OPEN|CLOSE|NDEF"),
    entry(MOUTH_REMAINING_MVM, "mouth_remaining_movements", UInt8, "range[0..255]"),
    entry(EYES_POSITION, "eyes_position", Text, "OPEN|CLOSE|NDEF"),
    entry(EYES_REMAINING_MVM, "eyes_remaining_movements", UInt8, "range[0..255]"),
    entry(DESCRIPTOR_COMPLETE, "descriptor_complete", Bool, "True"),
    entry(RF_STATE, "radio_state", Bool, "False|True"),
    entry(DONGLE_PLUG, "dongle_plug", Bool, "False|True"),
    entry(
        CHARGER_STATE,
        "charger_state",
        Text,
        "UNPLUGGED|CHARGING|PLUGGED_NO_POWER|TRICKLE|INHIBITED",
    ),
    entry(BATTERY_LEVEL, "battery_level", Int, "range[4000..6500] (mV)"),
    entry(BATTERY_STATE, "battery_state", Text, "EMPTY|LOW|HIGH|FULL"),
    entry(LIGHT_LEVEL, "light_level", Float, "range[0.0..100.0]"),
    entry(LEFT_LED_STATE, "left_led_state", Text, "ON|OFF|CHANGING"),
    entry(RIGHT_LED_STATE, "right_led_state", Text, "ON|OFF|CHANGING"),
    entry(CONNECTION_QUALITY, "connection_quality", Int, "range[0..100]"),
    entry(AUDIO_FLASH_PLAY, "audio_flash_play", Text, "TRACK_<range[0..255]>|STOP"),
    entry(AUDIO_GENERAL_PLAY, "audio_general_play", Bool, "False|True"),
    entry(FLASH_PROG_CURR_TRACK, "flash_programming_current_track", UInt8, "range[0..255]"),
    entry(FLASH_PROG_LAST_TRACK_SIZE, "flash_programming_last_track_size", Int, "<track size>"),
    entry(TUXCORE_SYMBOLIC_VERSION, "tuxcore_symbolic_version", Text, "<string>"),
    entry(TUXAUDIO_SYMBOLIC_VERSION, "tuxaudio_symbolic_version", Text, "<string>"),
    entry(FUXUSB_SYMBOLIC_VERSION, "fuxusb_symbolic_version", Text, "<string>"),
    entry(FUXRF_SYMBOLIC_VERSION, "fuxrf_symbolic_version", Text, "<string>"),
    entry(TUXRF_SYMBOLIC_VERSION, "tuxrf_symbolic_version", Text, "<string>"),
    entry(DRIVER_SYMBOLIC_VERSION, "driver_symbolic_version", Text, "<string>"),
    entry(SOUND_REFLASH_BEGIN, "sound_reflash_begin", Float, "<seconds>"),
    entry(
        SOUND_REFLASH_END,
        "sound_reflash_end",
        Text,
        "NO_ERROR|ERROR_RF_OFFLINE|ERROR_WAV|ERROR_USB",
    ),
    entry(SOUND_REFLASH_CURRENT_TRACK, "sound_reflash_current_track", UInt8, "range[0..255]"),
    entry(EYES_MOTOR_ON, "eyes_motor_on", Bool, "False|True"),
    entry(MOUTH_MOTOR_ON, "mouth_motor_on", Bool, "False|True"),
    entry(FLIPPERS_MOTOR_ON, "flippers_motor_on", Bool, "False|True"),
    entry(SPIN_LEFT_MOTOR_ON, "spin_left_motor_on", Bool, "False|True"),
    entry(SPIN_RIGHT_MOTOR_ON, "spin_right_motor_on", Bool, "False|True"),
    entry(FLASH_SOUND_COUNT, "sound_flash_count", UInt8, "range[0..255]"),
];

/// 获取通道目录条目
pub fn catalog_entry(id: StatusId) -> &'static StatusEntry {
    &CATALOG[id.index()]
}

/// 名称 → ID（精确匹配，不做模糊匹配）
pub fn resolve_id(name: &str) -> Result<StatusId, ProtocolError> {
    CATALOG
        .iter()
        .find(|e| e.name == name)
        .map(|e| e.id)
        .ok_or_else(|| ProtocolError::UnknownName(name.to_string()))
}

/// ID → 名称，`id` 超出 `[0, N)` 返回 `UnknownId`
pub fn resolve_name(id: i64) -> Result<&'static str, ProtocolError> {
    StatusId::new(id)
        .map(|id| catalog_entry(id).name)
        .ok_or(ProtocolError::UnknownId(id))
}

/// 导出全部通道的文档（ID、名称、类型、可能取值）
pub fn catalog_doc() -> String {
    let mut doc = String::from("Tux status documentation :\n--------------------------\n\n");
    for e in CATALOG.iter() {
        // 写入 String 不会失败
        let _ = write!(
            doc,
            "Status {:02}:\n    ID : {}\n    Name : {}\n    Value type : {}\n    Possible values : {}\n\n",
            e.id.raw(),
            e.id.raw(),
            e.name,
            e.value_type,
            e.value_doc
        );
    }
    doc
}

/// 按 `:` 拆分状态字符串，空输入返回空序列
pub fn tokenize_status(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split(FIELD_SEPARATOR).collect()
    }
}

/// 一条结构化状态记录
///
/// 线格式：`name:type:value:delay`，空值序列化为空字段，延迟保留三位小数。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusRecord {
    pub name: String,
    pub value_type: ValueType,
    pub value: Option<Value>,
    /// 距上一次更新的秒数
    pub delay: f64,
}

impl StatusRecord {
    /// 解析单条记录
    ///
    /// 空输入（或只有空白）返回 `Ok(None)`，表示“没有记录”，不是错误。
    ///
    /// # 错误
    ///
    /// - 字段数不为 4、名称为空、延迟非法：`MalformedRecord`
    /// - 未知类型名：`UnknownType`
    /// - 值与类型不匹配：`InvalidValue`
    pub fn parse(text: &str) -> Result<Option<Self>, ProtocolError> {
        let text = text.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            return Ok(None);
        }

        let fields: SmallVec<[&str; 4]> = text.split(FIELD_SEPARATOR).collect();
        let [name, type_name, raw_value, raw_delay] = fields.as_slice() else {
            return Err(ProtocolError::MalformedRecord(format!(
                "expected 4 fields, got {} in {text:?}",
                fields.len()
            )));
        };

        if name.is_empty() {
            return Err(ProtocolError::MalformedRecord(format!("empty name in {text:?}")));
        }

        let value_type: ValueType = type_name.parse()?;
        let value = if raw_value.is_empty() {
            None
        } else {
            Some(Value::parse(value_type, raw_value)?)
        };
        let delay = match raw_delay.trim().parse::<f64>() {
            Ok(d) if d.is_finite() && d >= 0.0 => d,
            _ => {
                return Err(ProtocolError::MalformedRecord(format!(
                    "invalid delay {raw_delay:?}"
                )));
            },
        };

        Ok(Some(Self {
            name: name.to_string(),
            value_type,
            value,
            delay,
        }))
    }

    /// 解析以记录分隔符连接的多条记录，跳过空行
    pub fn parse_all(text: &str) -> Result<Vec<Self>, ProtocolError> {
        let mut records = Vec::new();
        for line in text.split(RECORD_SEPARATOR) {
            if let Some(record) = Self::parse(line)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.name, self.value_type)?;
        if let Some(value) = &self.value {
            write!(f, "{value}")?;
        }
        write!(f, ":{:.3}", self.delay)
    }
}

/// 将记录连接为快照文本，总长度不超过 `limit` 字节
///
/// 每条记录后跟一个记录分隔符；放不下的尾部记录整条丢弃，
/// 因此输出总是完整记录的序列。
pub fn join_records<I>(records: I, limit: usize) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = String::new();
    for record in records {
        if out.len() + record.len() + RECORD_SEPARATOR.len_utf8() > limit {
            break;
        }
        out.push_str(&record);
        out.push(RECORD_SEPARATOR);
    }
    out
}
