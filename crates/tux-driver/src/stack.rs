//! 命令栈
//!
//! 有界 FIFO，容量固定。调用方线程通过 `push` 入队，IO 线程是唯一的出队者。
//! 所有操作只持有一把短锁，从不等待硬件。

use crate::command::Command;
use crate::error::DriverError;
use crate::resources::ResourceTracker;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tux_protocol::DEFAULT_STACK_CAPACITY;

/// 有界命令栈
#[derive(Debug)]
pub struct CommandStack {
    queue: Mutex<VecDeque<Command>>,
    capacity: usize,
    /// 没有硬件链路时为 false，`push` 返回 `ParserDisabled`
    enabled: AtomicBool,
    resources: ResourceTracker,
}

impl CommandStack {
    /// 创建命令栈（初始为禁用状态）
    ///
    /// `capacity` 为 0 时按 1 处理。
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            enabled: AtomicBool::new(false),
            resources: ResourceTracker::new(),
        }
    }

    /// 入队一条命令
    ///
    /// # 错误
    ///
    /// - `DriverError::ParserDisabled`：没有硬件链路
    /// - `DriverError::Busy`：命令需要的独占资源已被占用
    /// - `DriverError::StackOverflow`：栈已满，内容保持不变
    pub fn push(&self, command: Command) -> Result<(), DriverError> {
        if !self.is_enabled() {
            return Err(DriverError::ParserDisabled);
        }
        if let Some(resource) = command.resource()
            && self.resources.is_busy(resource)
        {
            return Err(DriverError::Busy(resource));
        }

        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            return Err(DriverError::StackOverflow {
                capacity: self.capacity,
            });
        }
        queue.push_back(command);
        Ok(())
    }

    /// 取出队首命令（FIFO）
    pub fn pop_next(&self) -> Option<Command> {
        self.queue.lock().pop_front()
    }

    /// 队首命令到期时取出
    ///
    /// `elapsed` 是距上一条命令执行完成的时间。检查与出队在同一把锁内完成，
    /// 等待期间被 `clear()` 丢弃的命令不会再被执行。
    pub fn pop_due(&self, elapsed: Duration) -> Option<Command> {
        let mut queue = self.queue.lock();
        match queue.front() {
            Some(front) if front.delay() <= elapsed => queue.pop_front(),
            _ => None,
        }
    }

    /// 队首命令的延迟
    pub fn next_delay(&self) -> Option<Duration> {
        self.queue.lock().front().map(Command::delay)
    }

    /// 清空所有排队命令，返回丢弃的条数
    pub fn clear(&self) -> usize {
        let mut queue = self.queue.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// 独占资源占用表
    pub fn resources(&self) -> &ResourceTracker {
        &self.resources
    }

    /// 排队命令的文本快照（按执行顺序）
    pub fn snapshot(&self) -> Vec<String> {
        self.queue.lock().iter().map(|c| c.instruction().to_string()).collect()
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use tux_protocol::Resource;

    fn enabled_stack(capacity: usize) -> CommandStack {
        let stack = CommandStack::new(capacity);
        stack.set_enabled(true);
        stack
    }

    fn cmd(text: &str, delay: f64) -> Command {
        Command::parse(text, delay).unwrap()
    }

    #[test]
    fn test_disabled_stack_rejects_push() {
        let stack = CommandStack::new(4);
        assert!(matches!(
            stack.push(cmd("open_mouth", 0.0)),
            Err(DriverError::ParserDisabled)
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let stack = enabled_stack(4);
        stack.push(cmd("open_mouth", 0.0)).unwrap();
        stack.push(cmd("close_mouth", 1.0)).unwrap();
        assert_eq!(stack.pop_next().unwrap().instruction().to_string(), "TUX_CMD:MOUTH:OPEN");
        assert_eq!(stack.pop_next().unwrap().instruction().to_string(), "TUX_CMD:MOUTH:CLOSE");
        assert!(stack.pop_next().is_none());
    }

    #[test]
    fn test_overflow_leaves_contents_untouched() {
        let stack = enabled_stack(2);
        stack.push(cmd("open_mouth", 0.0)).unwrap();
        stack.push(cmd("close_mouth", 0.0)).unwrap();
        let before = stack.snapshot();

        let err = stack.push(cmd("open_eyes", 0.0)).unwrap_err();
        assert!(matches!(err, DriverError::StackOverflow { capacity: 2 }));
        assert_eq!(stack.snapshot(), before);
    }

    #[test]
    fn test_pop_due_respects_delay() {
        let stack = enabled_stack(4);
        stack.push(cmd("open_mouth", 0.5)).unwrap();
        assert!(stack.pop_due(Duration::from_millis(100)).is_none());
        assert_eq!(stack.len(), 1);
        assert!(stack.pop_due(Duration::from_millis(500)).is_some());
    }

    #[test]
    fn test_clear_then_pop_is_empty() {
        let stack = enabled_stack(8);
        for _ in 0..5 {
            stack.push(cmd("open_eyes", 0.0)).unwrap();
        }
        assert_eq!(stack.clear(), 5);
        assert!(stack.pop_next().is_none());
        assert!(stack.next_delay().is_none());
    }

    #[test]
    fn test_busy_resource_rejects_sound_play() {
        let stack = enabled_stack(4);
        stack.resources().occupy(Resource::FlashProgramming);
        let err = stack
            .push(cmd("TUX_CMD:SOUND_FLASH:PLAY:2,100.0", 0.0))
            .unwrap_err();
        assert!(matches!(err, DriverError::Busy(Resource::SoundChannel)));
        assert!(stack.is_empty());

        // 不需要独占资源的命令不受影响
        stack.push(cmd("open_eyes", 0.0)).unwrap();
    }

    #[test]
    fn test_concurrent_push_never_exceeds_capacity() {
        let stack = Arc::new(enabled_stack(64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stack = stack.clone();
                thread::spawn(move || {
                    (0..20)
                        .filter(|_| stack.push(cmd("open_eyes", 0.0)).is_ok())
                        .count()
                })
            })
            .collect();
        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 64);
        assert_eq!(stack.len(), 64);
    }

    proptest! {
        #[test]
        fn prop_push_grows_by_one_until_full(capacity in 1usize..16, pushes in 0usize..32) {
            let stack = enabled_stack(capacity);
            for i in 0..pushes {
                let before = stack.len();
                let result = stack.push(cmd("open_mouth", 0.0));
                if i < capacity {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(stack.len(), before + 1);
                } else {
                    let overflow = matches!(result, Err(DriverError::StackOverflow { .. }));
                    prop_assert!(overflow);
                    prop_assert_eq!(stack.len(), before);
                }
            }
        }

        #[test]
        fn prop_clear_always_empties(count in 0usize..20) {
            let stack = enabled_stack(32);
            for _ in 0..count {
                stack.push(cmd("close_eyes", 0.1)).unwrap();
            }
            stack.clear();
            prop_assert!(stack.pop_next().is_none());
        }
    }
}
