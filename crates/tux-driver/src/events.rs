//! 事件分发
//!
//! 每个事件类别只有一个处理器槽位：
//!
//! - 注册新的处理器会替换旧的
//! - 未注册时事件被静默丢弃
//! - 处理器在 IO 线程上同步调用，调用时不持有任何锁
//!
//! # 使用示例
//!
//! ```rust
//! use tux_driver::events::{Event, EventDispatcher};
//!
//! let events = EventDispatcher::new();
//! events.set_status_handler(|record| println!("{record}"));
//! events.emit(&Event::EndCycle); // 未注册 OnEndCycle，静默丢弃
//! ```

use parking_lot::RwLock;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;
use tux_protocol::StatusRecord;

/// 状态变化处理器
pub type StatusHandler = Arc<dyn Fn(&StatusRecord) + Send + Sync>;

/// 无负载事件处理器
pub type NotifyHandler = Arc<dyn Fn() + Send + Sync>;

/// 事件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    OnStatus,
    OnEndCycle,
    OnDongleConnected,
    OnDongleDisconnected,
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventClass::OnStatus => "OnStatus",
            EventClass::OnEndCycle => "OnEndCycle",
            EventClass::OnDongleConnected => "OnDongleConnected",
            EventClass::OnDongleDisconnected => "OnDongleDisconnected",
        };
        f.write_str(name)
    }
}

/// 一次事件及其负载
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Status(&'a StatusRecord),
    EndCycle,
    DongleConnected,
    DongleDisconnected,
}

impl Event<'_> {
    pub fn class(&self) -> EventClass {
        match self {
            Event::Status(_) => EventClass::OnStatus,
            Event::EndCycle => EventClass::OnEndCycle,
            Event::DongleConnected => EventClass::OnDongleConnected,
            Event::DongleDisconnected => EventClass::OnDongleDisconnected,
        }
    }
}

/// 单槽位事件分发器
#[derive(Default)]
pub struct EventDispatcher {
    status: RwLock<Option<StatusHandler>>,
    end_cycle: RwLock<Option<NotifyHandler>>,
    connected: RwLock<Option<NotifyHandler>>,
    disconnected: RwLock<Option<NotifyHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify_slot(&self, class: EventClass) -> Option<&RwLock<Option<NotifyHandler>>> {
        match class {
            EventClass::OnStatus => None,
            EventClass::OnEndCycle => Some(&self.end_cycle),
            EventClass::OnDongleConnected => Some(&self.connected),
            EventClass::OnDongleDisconnected => Some(&self.disconnected),
        }
    }

    /// 注册 OnStatus 处理器（替换已有的）
    pub fn set_status_handler<F>(&self, handler: F)
    where
        F: Fn(&StatusRecord) + Send + Sync + 'static,
    {
        *self.status.write() = Some(Arc::new(handler));
    }

    pub fn set_end_cycle_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.end_cycle.write() = Some(Arc::new(handler));
    }

    pub fn set_dongle_connected_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.connected.write() = Some(Arc::new(handler));
    }

    pub fn set_dongle_disconnected_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.disconnected.write() = Some(Arc::new(handler));
    }

    /// 清除某一类别的处理器
    pub fn clear(&self, class: EventClass) {
        match self.notify_slot(class) {
            Some(slot) => *slot.write() = None,
            None => *self.status.write() = None,
        }
    }

    pub fn is_registered(&self, class: EventClass) -> bool {
        match self.notify_slot(class) {
            Some(slot) => slot.read().is_some(),
            None => self.status.read().is_some(),
        }
    }

    /// 分发事件
    ///
    /// 先克隆处理器的 `Arc` 并释放读锁，再调用处理器；处理器内部可以安全地
    /// 重新注册或清除处理器。处理器 panic 会被捕获并记录，不会终止 IO 线程。
    pub fn emit(&self, event: &Event<'_>) {
        let class = event.class();
        let result = match event {
            Event::Status(record) => {
                let Some(handler) = self.status.read().clone() else {
                    return;
                };
                catch_unwind(AssertUnwindSafe(|| handler(record)))
            },
            _ => {
                let Some(handler) = self.notify_slot(class).and_then(|slot| slot.read().clone())
                else {
                    return;
                };
                catch_unwind(AssertUnwindSafe(|| handler()))
            },
        };
        if result.is_err() {
            error!("{} handler panicked", class);
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("on_status", &self.is_registered(EventClass::OnStatus))
            .field("on_end_cycle", &self.is_registered(EventClass::OnEndCycle))
            .field("on_dongle_connected", &self.is_registered(EventClass::OnDongleConnected))
            .field(
                "on_dongle_disconnected",
                &self.is_registered(EventClass::OnDongleDisconnected),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tux_protocol::ValueType;

    fn record() -> StatusRecord {
        StatusRecord {
            name: "battery_level".into(),
            value_type: ValueType::Int,
            value: None,
            delay: 0.0,
        }
    }

    #[test]
    fn test_unregistered_event_is_dropped() {
        let events = EventDispatcher::new();
        events.emit(&Event::EndCycle);
        events.emit(&Event::Status(&record()));
        assert!(!events.is_registered(EventClass::OnEndCycle));
    }

    #[test]
    fn test_second_handler_replaces_first() {
        let events = EventDispatcher::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        events.set_end_cycle_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        events.set_end_cycle_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(&Event::EndCycle);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_payload_is_delivered() {
        let events = EventDispatcher::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        events.set_status_handler(move |record| sink.lock().push(record.name.clone()));

        events.emit(&Event::Status(&record()));
        assert_eq!(*seen.lock(), vec!["battery_level".to_string()]);
    }

    #[test]
    fn test_clear_handler() {
        let events = EventDispatcher::new();
        events.set_dongle_connected_handler(|| {});
        assert!(events.is_registered(EventClass::OnDongleConnected));
        events.clear(EventClass::OnDongleConnected);
        assert!(!events.is_registered(EventClass::OnDongleConnected));
    }

    #[test]
    fn test_handler_may_reregister_itself() {
        let events = Arc::new(EventDispatcher::new());
        let inner = events.clone();
        events.set_dongle_disconnected_handler(move || {
            inner.set_dongle_disconnected_handler(|| {});
        });
        events.emit(&Event::DongleDisconnected);
        assert!(events.is_registered(EventClass::OnDongleDisconnected));
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let events = EventDispatcher::new();
        events.set_end_cycle_handler(|| panic!("handler failure"));
        events.emit(&Event::EndCycle);
    }
}
