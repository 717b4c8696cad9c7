//! 驱动运行指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 驱动实时指标
///
/// 调用方线程更新入队相关计数，IO 线程更新其余计数。
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// 成功入队的命令数
    pub commands_pushed: AtomicU64,
    /// 已下发到硬件的命令数
    pub commands_dispatched: AtomicU64,
    /// 下发失败的命令数（超时或链路错误）
    pub commands_failed: AtomicU64,
    /// 因栈满被拒绝的入队次数
    pub stack_overflows: AtomicU64,
    /// 因资源占用被拒绝的入队次数
    pub busy_rejections: AtomicU64,
    /// 写入注册表的状态更新数
    pub status_updates: AtomicU64,
    /// 无法解析而被丢弃的状态更新数
    pub status_parse_errors: AtomicU64,
    /// IO 循环次数
    pub cycles: AtomicU64,
    /// 链路超时次数（发送超时或长时间无上报）
    pub link_timeouts: AtomicU64,
}

impl DriverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_pushed: self.commands_pushed.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            stack_overflows: self.stack_overflows.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            status_parse_errors: self.status_parse_errors.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            link_timeouts: self.link_timeouts.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.commands_pushed,
            &self.commands_dispatched,
            &self.commands_failed,
            &self.stack_overflows,
            &self.busy_rejections,
            &self.status_updates,
            &self.status_parse_errors,
            &self.cycles,
            &self.link_timeouts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub commands_pushed: u64,
    pub commands_dispatched: u64,
    pub commands_failed: u64,
    pub stack_overflows: u64,
    pub busy_rejections: u64,
    pub status_updates: u64,
    pub status_parse_errors: u64,
    pub cycles: u64,
    pub link_timeouts: u64,
}

impl MetricsSnapshot {
    /// 命令下发失败率（百分比），没有下发过命令时返回 0.0
    pub fn failure_rate(&self) -> f64 {
        let attempts = self.commands_dispatched + self.commands_failed;
        if attempts == 0 {
            return 0.0;
        }
        (self.commands_failed as f64 / attempts as f64) * 100.0
    }
}
