//! 状态通道 ID 定义
//!
//! ID 是 `0..STATUS_COUNT` 之间的稳定小整数，与 [`crate::status::CATALOG`]
//! 中的条目一一对应。

use crate::constants::STATUS_COUNT;
use std::fmt;

/// 状态通道 ID
///
/// 只能通过 [`StatusId::new`] 或本模块的常量获得，保证总在目录范围内。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusId(u8);

impl StatusId {
    /// 从原始整数创建，超出 `[0, STATUS_COUNT)` 返回 `None`
    pub fn new(raw: i64) -> Option<Self> {
        if (0..STATUS_COUNT as i64).contains(&raw) {
            Some(Self(raw as u8))
        } else {
            None
        }
    }

    /// 目录下标
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 原始整数值
    pub const fn raw(self) -> i32 {
        self.0 as i32
    }

    /// 遍历全部通道 ID（按 ID 升序）
    pub fn all() -> impl Iterator<Item = StatusId> {
        (0..STATUS_COUNT as u8).map(StatusId)
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StatusId> for i32 {
    fn from(id: StatusId) -> Self {
        id.raw()
    }
}

pub const FLIPPERS_POSITION: StatusId = StatusId(0);
pub const FLIPPERS_REMAINING_MVM: StatusId = StatusId(1);
pub const SPINNING_DIRECTION: StatusId = StatusId(2);
pub const SPINNING_REMAINING_MVM: StatusId = StatusId(3);
pub const LEFT_WING_BUTTON: StatusId = StatusId(4);
pub const RIGHT_WING_BUTTON: StatusId = StatusId(5);
pub const HEAD_BUTTON: StatusId = StatusId(6);
pub const REMOTE_BUTTON: StatusId = StatusId(7);
pub const MOUTH_POSITION: StatusId = StatusId(8);
pub const MOUTH_REMAINING_MVM: StatusId = StatusId(9);
pub const EYES_POSITION: StatusId = StatusId(10);
pub const EYES_REMAINING_MVM: StatusId = StatusId(11);
pub const DESCRIPTOR_COMPLETE: StatusId = StatusId(12);
/// 无线链路状态（目录名 `radio_state`）
pub const RF_STATE: StatusId = StatusId(13);
pub const DONGLE_PLUG: StatusId = StatusId(14);
pub const CHARGER_STATE: StatusId = StatusId(15);
pub const BATTERY_LEVEL: StatusId = StatusId(16);
pub const BATTERY_STATE: StatusId = StatusId(17);
pub const LIGHT_LEVEL: StatusId = StatusId(18);
pub const LEFT_LED_STATE: StatusId = StatusId(19);
pub const RIGHT_LED_STATE: StatusId = StatusId(20);
pub const CONNECTION_QUALITY: StatusId = StatusId(21);
pub const AUDIO_FLASH_PLAY: StatusId = StatusId(22);
pub const AUDIO_GENERAL_PLAY: StatusId = StatusId(23);
pub const FLASH_PROG_CURR_TRACK: StatusId = StatusId(24);
pub const FLASH_PROG_LAST_TRACK_SIZE: StatusId = StatusId(25);
pub const TUXCORE_SYMBOLIC_VERSION: StatusId = StatusId(26);
pub const TUXAUDIO_SYMBOLIC_VERSION: StatusId = StatusId(27);
pub const FUXUSB_SYMBOLIC_VERSION: StatusId = StatusId(28);
pub const FUXRF_SYMBOLIC_VERSION: StatusId = StatusId(29);
pub const TUXRF_SYMBOLIC_VERSION: StatusId = StatusId(30);
pub const DRIVER_SYMBOLIC_VERSION: StatusId = StatusId(31);
pub const SOUND_REFLASH_BEGIN: StatusId = StatusId(32);
pub const SOUND_REFLASH_END: StatusId = StatusId(33);
pub const SOUND_REFLASH_CURRENT_TRACK: StatusId = StatusId(34);
pub const EYES_MOTOR_ON: StatusId = StatusId(35);
pub const MOUTH_MOTOR_ON: StatusId = StatusId(36);
pub const FLIPPERS_MOTOR_ON: StatusId = StatusId(37);
pub const SPIN_LEFT_MOTOR_ON: StatusId = StatusId(38);
pub const SPIN_RIGHT_MOTOR_ON: StatusId = StatusId(39);
pub const FLASH_SOUND_COUNT: StatusId = StatusId(40);

/// 与链路连接相关的通道（ResetDongle 时标记为 stale）
pub const CONNECTION_CHANNELS: [StatusId; 3] = [DONGLE_PLUG, CONNECTION_QUALITY, RF_STATE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_id_bounds() {
        assert_eq!(StatusId::new(0), Some(FLIPPERS_POSITION));
        assert_eq!(StatusId::new(40), Some(FLASH_SOUND_COUNT));
        assert_eq!(StatusId::new(41), None);
        assert_eq!(StatusId::new(-1), None);
        assert_eq!(StatusId::new(i64::MAX), None);
    }

    #[test]
    fn test_all_ids_are_dense() {
        let ids: Vec<_> = StatusId::all().collect();
        assert_eq!(ids.len(), STATUS_COUNT);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }
}
