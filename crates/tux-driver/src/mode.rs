//! 驱动生命周期状态
//!
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LifecycleState {
    #[default]
    Stopped = 0,
    /// 正在握手，尚未接受命令
    Starting = 1,
    Running = 2,
    /// 等待 IO 线程完成当前命令
    Stopping = 3,
}

impl LifecycleState {
    /// 从 u8 转换，无效值视为 Stopped
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// 生命周期状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicLifecycle {
    inner: AtomicU8,
}

impl AtomicLifecycle {
    pub fn new(state: LifecycleState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: LifecycleState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换
    ///
    /// 当前值等于 `current` 时设置为 `new` 并返回 true，否则返回 false。
    pub fn transition(&self, current: LifecycleState, new: LifecycleState) -> bool {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_conversion() {
        for state in [
            LifecycleState::Stopped,
            LifecycleState::Starting,
            LifecycleState::Running,
            LifecycleState::Stopping,
        ] {
            assert_eq!(LifecycleState::from_u8(state.as_u8()), state);
        }
        assert_eq!(LifecycleState::from_u8(200), LifecycleState::Stopped);
    }

    #[test]
    fn test_transition() {
        let state = AtomicLifecycle::new(LifecycleState::Stopped);
        assert!(state.transition(LifecycleState::Stopped, LifecycleState::Starting));
        assert!(!state.transition(LifecycleState::Stopped, LifecycleState::Starting));
        assert_eq!(state.get(), LifecycleState::Starting);
        state.set(LifecycleState::Running);
        assert!(state.get().is_running());
        assert_eq!(state.get().to_string(), "running");
    }
}
