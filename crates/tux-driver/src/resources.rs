//! 独占硬件资源占用表
//!
//! 声音通道与闪存编程互斥：任一占用时，另一方也视为忙。

use std::sync::atomic::{AtomicBool, Ordering};
use tux_protocol::Resource;

#[derive(Debug, Default)]
pub struct ResourceTracker {
    sound_channel: AtomicBool,
    flash_programming: AtomicBool,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, resource: Resource) -> &AtomicBool {
        match resource {
            Resource::SoundChannel => &self.sound_channel,
            Resource::FlashProgramming => &self.flash_programming,
        }
    }

    /// 资源（或与之互斥的资源）是否被占用
    pub fn is_busy(&self, resource: Resource) -> bool {
        // 播放与闪存编程共用音频芯片
        let other = match resource {
            Resource::SoundChannel => Resource::FlashProgramming,
            Resource::FlashProgramming => Resource::SoundChannel,
        };
        self.is_held(resource) || self.is_held(other)
    }

    /// 尝试占用资源，忙时返回 false
    pub fn try_acquire(&self, resource: Resource) -> bool {
        if self.is_busy(resource) {
            return false;
        }
        self.flag(resource)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 标记资源被占用（由硬件状态驱动，不检查互斥）
    pub fn occupy(&self, resource: Resource) {
        self.flag(resource).store(true, Ordering::Release);
    }

    pub fn release(&self, resource: Resource) {
        self.flag(resource).store(false, Ordering::Release);
    }

    pub fn is_held(&self, resource: Resource) -> bool {
        self.flag(resource).load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_are_mutually_exclusive() {
        let tracker = ResourceTracker::new();
        assert!(tracker.try_acquire(Resource::FlashProgramming));
        assert!(tracker.is_busy(Resource::SoundChannel));
        assert!(!tracker.try_acquire(Resource::SoundChannel));

        tracker.release(Resource::FlashProgramming);
        assert!(!tracker.is_busy(Resource::SoundChannel));
        assert!(tracker.try_acquire(Resource::SoundChannel));
        assert!(!tracker.try_acquire(Resource::SoundChannel));
    }

    #[test]
    fn test_occupy_from_status() {
        let tracker = ResourceTracker::new();
        tracker.occupy(Resource::SoundChannel);
        assert!(tracker.is_held(Resource::SoundChannel));
        assert!(!tracker.is_held(Resource::FlashProgramming));
        tracker.release(Resource::SoundChannel);
        assert!(!tracker.is_busy(Resource::FlashProgramming));
    }
}
