//! 驱动与传输层之间交换的帧
//!
//! 帧的具体字节编码属于传输层（dongle 固件协议），这里只定义语义：
//! - 下行 [`TuxFrame`]：一条指令或一次声音闪存编程请求
//! - 上行 [`LinkEvent`]：一条状态上报或 dongle 拔出

use crate::ids::StatusId;
use crate::instruction::Instruction;
use std::path::PathBuf;

/// 一次声音闪存编程请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflashPlan {
    /// 按顺序写入闪存的 WAV 文件
    pub tracks: Vec<PathBuf>,
    /// 每个曲目的音频数据字节数（不含 WAV 头）
    pub sizes: Vec<u64>,
    /// 每个曲目占用的闪存块数
    pub blocks: Vec<u32>,
}

impl ReflashPlan {
    /// 全部曲目占用的块数
    pub fn total_blocks(&self) -> u32 {
        self.blocks.iter().sum()
    }

    /// 预计的编程耗时（秒）：擦除 10 秒，8000 字节/秒写入，每个曲目另加 0.97 秒
    pub fn estimated_duration_secs(&self) -> f64 {
        let bytes: u64 = self.sizes.iter().sum();
        10.0 + bytes as f64 / 8000.0 + self.tracks.len() as f64 * 0.97
    }
}

/// 下行帧
#[derive(Debug, Clone, PartialEq)]
pub enum TuxFrame {
    /// 执行一条指令
    Command(Instruction),
    /// 开始声音闪存编程
    SoundReflash(ReflashPlan),
}

impl From<Instruction> for TuxFrame {
    fn from(instruction: Instruction) -> Self {
        TuxFrame::Command(instruction)
    }
}

/// 硬件上报的一条状态
///
/// `raw` 是值的原始文本，由驱动按目录类型解析；
/// `state` 是硬件给出的有效性标记（例如 `fresh`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    pub id: StatusId,
    pub raw: String,
    pub state: String,
}

impl StatusFrame {
    pub fn new(id: StatusId, raw: impl Into<String>) -> Self {
        Self {
            id,
            raw: raw.into(),
            state: "fresh".to_string(),
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }
}

/// 上行事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// 状态上报
    Status(StatusFrame),
    /// dongle 被拔出，链路不可用
    DongleUnplugged,
}
