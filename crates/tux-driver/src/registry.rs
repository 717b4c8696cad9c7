//! 状态注册表
//!
//! 每个通道一个 `ArcSwap<StatusValue>` 槽位：
//! - IO 线程是唯一写者，整体替换槽位中的快照
//! - 任意线程无锁读取最近一次写入的快照，不会阻塞在硬件 IO 上
//!
//! 值解析失败时保留旧值，只记录日志，不向调用方报告。

use crate::error::DriverError;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use tux_protocol::constants::{ALL_STATUS_BUFFER_LEN, DRIVER_VERSION_PREFIX, STATUS_BUFFER_LEN};
use tux_protocol::status::{
    CATALOG, ChannelState, StatusRecord, Value, ValueType, catalog_entry, join_records,
    should_report,
};
use tux_protocol::{DRIVER_SYMBOLIC_VERSION, StatusId, UNDEFINED};

/// 单个通道的当前值
#[derive(Debug, Clone, PartialEq)]
pub struct StatusValue {
    pub value_type: ValueType,
    /// 首次更新前为 `None`
    pub value: Option<Value>,
    pub state: ChannelState,
    /// 本次更新距上一次更新的秒数
    pub last_update_delay: f64,
    updated_at: Option<Instant>,
}

impl StatusValue {
    fn empty(value_type: ValueType) -> Self {
        Self {
            value_type,
            value: None,
            state: ChannelState::Unknown,
            last_update_delay: 0.0,
            updated_at: None,
        }
    }

    /// 最近一次更新的时间
    pub fn updated_at(&self) -> Option<Instant> {
        self.updated_at
    }
}

/// `update()` 的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// 原始文本无法解析，旧值保留
    Rejected,
    /// 已写入，但变化未达到事件阈值
    Stored,
    /// 已写入，需要上报 OnStatus 事件
    Reported(StatusRecord),
}

/// 状态注册表
#[derive(Debug)]
pub struct StatusRegistry {
    channels: Box<[ArcSwap<StatusValue>]>,
    /// 每个通道最后一次上报事件时的值（只有 IO 线程访问）
    reported: Mutex<Vec<Option<Value>>>,
    created_at: Instant,
}

impl StatusRegistry {
    /// 创建注册表，所有通道为空值
    ///
    /// `driver_symbolic_version` 在初始化时写入本驱动的版本。
    pub fn new() -> Self {
        let channels = CATALOG
            .iter()
            .map(|entry| ArcSwap::from_pointee(StatusValue::empty(entry.value_type)))
            .collect();
        let registry = Self {
            channels,
            reported: Mutex::new(vec![None; CATALOG.len()]),
            created_at: Instant::now(),
        };
        let version = format!("{DRIVER_VERSION_PREFIX}{}", env!("CARGO_PKG_VERSION"));
        registry.store(
            DRIVER_SYMBOLIC_VERSION,
            Value::Text(version),
            ChannelState::Fresh,
            false,
        );
        registry
    }

    /// 名称 → ID（精确匹配）
    ///
    /// # 错误
    ///
    /// 未知名称返回 `DriverError::InvalidName`。
    pub fn resolve_id(&self, name: &str) -> Result<StatusId, DriverError> {
        Ok(tux_protocol::resolve_id(name)?)
    }

    /// ID → 名称
    ///
    /// # 错误
    ///
    /// `id` 不在 `[0, N)` 内返回 `DriverError::InvalidIdentifier`。
    pub fn resolve_name(&self, id: i64) -> Result<&'static str, DriverError> {
        Ok(tux_protocol::resolve_name(id)?)
    }

    /// 读取通道当前值（无锁）
    pub fn get(&self, id: i64) -> Result<StatusValue, DriverError> {
        let id = StatusId::new(id).ok_or(DriverError::InvalidIdentifier(id))?;
        Ok(self.value(id))
    }

    /// 读取通道当前值（ID 已校验）
    pub fn value(&self, id: StatusId) -> StatusValue {
        self.channels[id.index()].load().as_ref().clone()
    }

    /// 单通道的结构化记录
    pub fn record(&self, id: StatusId) -> StatusRecord {
        let current = self.channels[id.index()].load();
        StatusRecord {
            name: catalog_entry(id).name.to_string(),
            value_type: current.value_type,
            value: current.value.clone(),
            delay: current.last_update_delay,
        }
    }

    /// 单通道的 `name:type:value:delay` 文本（不超过 256 字节）
    pub fn state_text(&self, id: StatusId) -> String {
        self.record(id).to_string()
    }

    /// 单通道值的文本形式，空值返回 `"UNDEFINED"`
    pub fn value_text(&self, id: StatusId) -> String {
        match &self.channels[id.index()].load().value {
            Some(value) => value.to_string(),
            None => UNDEFINED.to_string(),
        }
    }

    /// 全部通道的快照文本
    ///
    /// 记录按 ID 升序排列，每条以 `\n` 结尾；总长度不超过 8182 字节，
    /// 放不下的尾部记录整条丢弃。
    pub fn get_all_as_text(&self) -> String {
        join_records(
            StatusId::all().map(|id| self.state_text(id)),
            ALL_STATUS_BUFFER_LEN,
        )
    }

    /// 用硬件上报的原始文本更新通道（仅由 IO 线程调用）
    ///
    /// 按目录类型显式解析 `raw`；失败时旧值保持不变并记录警告。
    pub fn update(&self, id: StatusId, raw: &str, state: ChannelState) -> UpdateOutcome {
        let entry = catalog_entry(id);
        let value = match Value::parse(entry.value_type, raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding status update for {}: {}", entry.name, e);
                return UpdateOutcome::Rejected;
            },
        };
        self.store(id, value, state, true)
    }

    /// 写入一个已类型化的值（驱动自身维护的通道，例如 `dongle_plug`）
    pub(crate) fn set(&self, id: StatusId, value: Value) -> UpdateOutcome {
        self.store(id, value, ChannelState::Fresh, true)
    }

    fn store(&self, id: StatusId, value: Value, state: ChannelState, notify: bool) -> UpdateOutcome {
        let entry = catalog_entry(id);
        if value.value_type() != entry.value_type {
            warn!(
                "Discarding {} value for {} channel {}",
                value.value_type(),
                entry.value_type,
                entry.name
            );
            return UpdateOutcome::Rejected;
        }

        let slot = &self.channels[id.index()];
        let previous = slot.load();
        let now = Instant::now();
        let since = previous.updated_at.unwrap_or(self.created_at);
        let next = StatusValue {
            value_type: entry.value_type,
            value: Some(value.clone()),
            state,
            last_update_delay: now.saturating_duration_since(since).as_secs_f64(),
            updated_at: Some(now),
        };

        let record = StatusRecord {
            name: entry.name.to_string(),
            value_type: entry.value_type,
            value: next.value.clone(),
            delay: next.last_update_delay,
        };
        // 单通道查询的缓冲上限（含结尾的 NUL 位）
        if record.to_string().len() >= STATUS_BUFFER_LEN {
            warn!("Discarding oversized status value for {}", entry.name);
            return UpdateOutcome::Rejected;
        }

        slot.store(Arc::new(next));

        if !notify {
            return UpdateOutcome::Stored;
        }
        let mut reported = self.reported.lock();
        let last = &mut reported[id.index()];
        if should_report(last.as_ref(), &value, entry.event_threshold) {
            *last = Some(value);
            UpdateOutcome::Reported(record)
        } else {
            UpdateOutcome::Stored
        }
    }

    /// 把一组通道标记为 stale，值保持不变
    pub fn mark_stale(&self, ids: &[StatusId]) {
        for id in ids {
            let slot = &self.channels[id.index()];
            let mut next = slot.load().as_ref().clone();
            next.state = ChannelState::Stale;
            slot.store(Arc::new(next));
            debug!("{} marked stale", catalog_entry(*id).name);
        }
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tux_protocol::ids::*;
    use tux_protocol::status::resolve_id;

    #[test]
    fn test_initial_values_are_null() {
        let registry = StatusRegistry::new();
        let battery = registry.value(BATTERY_LEVEL);
        assert_eq!(battery.value, None);
        assert_eq!(battery.value_type, ValueType::Int);
        assert_eq!(battery.state, ChannelState::Unknown);
        assert_eq!(registry.value_text(BATTERY_LEVEL), "UNDEFINED");
    }

    #[test]
    fn test_driver_version_is_seeded() {
        let registry = StatusRegistry::new();
        let text = registry.value_text(DRIVER_SYMBOLIC_VERSION);
        assert!(text.starts_with("libtuxdriver_"), "{text}");
    }

    #[test]
    fn test_update_parses_per_type() {
        let registry = StatusRegistry::new();
        let outcome = registry.update(BATTERY_LEVEL, "4800", ChannelState::Fresh);
        assert!(matches!(outcome, UpdateOutcome::Reported(_)));
        assert_eq!(registry.value(BATTERY_LEVEL).value, Some(Value::Int(4800)));

        registry.update(HEAD_BUTTON, "true", ChannelState::Fresh);
        assert_eq!(registry.value(HEAD_BUTTON).value, Some(Value::Bool(true)));
        assert_eq!(registry.value_text(HEAD_BUTTON), "True");
    }

    #[test]
    fn test_parse_failure_keeps_previous_value() {
        let registry = StatusRegistry::new();
        registry.update(BATTERY_LEVEL, "4800", ChannelState::Fresh);
        let outcome = registry.update(BATTERY_LEVEL, "__import__('os')", ChannelState::Fresh);
        assert_eq!(outcome, UpdateOutcome::Rejected);
        assert_eq!(registry.value(BATTERY_LEVEL).value, Some(Value::Int(4800)));
    }

    #[test]
    fn test_threshold_suppresses_small_float_changes() {
        let registry = StatusRegistry::new();
        assert!(matches!(
            registry.update(LIGHT_LEVEL, "10.0", ChannelState::Fresh),
            UpdateOutcome::Reported(_)
        ));
        assert_eq!(
            registry.update(LIGHT_LEVEL, "10.4", ChannelState::Fresh),
            UpdateOutcome::Stored
        );
        // 与最后一次上报值比较，而不是与上一次写入值比较
        assert!(matches!(
            registry.update(LIGHT_LEVEL, "11.0", ChannelState::Fresh),
            UpdateOutcome::Reported(_)
        ));
    }

    #[test]
    fn test_unchanged_string_is_not_reported() {
        let registry = StatusRegistry::new();
        registry.update(MOUTH_POSITION, "OPEN", ChannelState::Fresh);
        assert_eq!(
            registry.update(MOUTH_POSITION, "OPEN", ChannelState::Fresh),
            UpdateOutcome::Stored
        );
    }

    #[test]
    fn test_oversized_string_is_rejected() {
        let registry = StatusRegistry::new();
        let long = "x".repeat(300);
        assert_eq!(
            registry.update(TUXCORE_SYMBOLIC_VERSION, &long, ChannelState::Fresh),
            UpdateOutcome::Rejected
        );
        assert!(registry.state_text(TUXCORE_SYMBOLIC_VERSION).len() < STATUS_BUFFER_LEN);
    }

    #[test]
    fn test_get_out_of_range() {
        let registry = StatusRegistry::new();
        assert!(matches!(registry.get(41), Err(DriverError::InvalidIdentifier(41))));
        assert!(matches!(registry.get(-3), Err(DriverError::InvalidIdentifier(-3))));
        assert!(matches!(
            registry.resolve_id("nope"),
            Err(DriverError::InvalidName(_))
        ));
    }

    #[test]
    fn test_mark_stale_keeps_value() {
        let registry = StatusRegistry::new();
        registry.update(CONNECTION_QUALITY, "90", ChannelState::Fresh);
        registry.mark_stale(&CONNECTION_CHANNELS);
        let quality = registry.value(CONNECTION_QUALITY);
        assert_eq!(quality.state, ChannelState::Stale);
        assert_eq!(quality.value, Some(Value::Int(90)));
        assert_eq!(registry.value(DONGLE_PLUG).state, ChannelState::Stale);
    }

    #[test]
    fn test_all_text_round_trips_into_catalog_keys() {
        let registry = StatusRegistry::new();
        registry.update(BATTERY_LEVEL, "5000", ChannelState::Fresh);
        registry.update(LIGHT_LEVEL, "55.5", ChannelState::Fresh);
        let text = registry.get_all_as_text();
        assert!(text.len() <= ALL_STATUS_BUFFER_LEN);

        let records = StatusRecord::parse_all(&text).unwrap();
        assert_eq!(records.len(), CATALOG.len());
        for record in &records {
            assert!(resolve_id(&record.name).is_ok(), "{}", record.name);
        }
        let battery = records.iter().find(|r| r.name == "battery_level").unwrap();
        assert_eq!(battery.value, Some(Value::Int(5000)));
    }

    proptest! {
        #[test]
        fn prop_snapshot_never_exceeds_bound(len in 0usize..240) {
            let registry = StatusRegistry::new();
            let text = "v".repeat(len);
            for id in [
                TUXCORE_SYMBOLIC_VERSION,
                TUXAUDIO_SYMBOLIC_VERSION,
                FUXUSB_SYMBOLIC_VERSION,
                FUXRF_SYMBOLIC_VERSION,
                TUXRF_SYMBOLIC_VERSION,
                REMOTE_BUTTON,
                CHARGER_STATE,
                BATTERY_STATE,
            ] {
                registry.update(id, &text, ChannelState::Fresh);
            }
            let snapshot = registry.get_all_as_text();
            prop_assert!(snapshot.len() <= ALL_STATUS_BUFFER_LEN);
            for record in StatusRecord::parse_all(&snapshot).unwrap() {
                prop_assert!(resolve_id(&record.name).is_ok());
            }
        }
    }
}
