//! Driver API 模块
//!
//! 提供对外的 `TuxDriver`，封装 IO 线程的启停和各组件的访问。
//!
//! 没有配置链路时驱动运行在“无硬件”模式：
//!
//! - `start()` 立即进入 Running，不启动 IO 线程
//! - 命令入队返回 `ParserDisabled`
//! - 读接口返回哨兵值（`-1`、`"UNDEFINED"`、空字符串）
//! - `stop()` 是安全的空操作

use crate::command::Command;
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::events::EventDispatcher;
use crate::logging;
use crate::macros;
use crate::metrics::{DriverMetrics, MetricsSnapshot};
use crate::mode::{AtomicLifecycle, LifecycleState};
use crate::pipeline::{BoxedLink, DriverContext, PipelineConfig, WorkerRequest, io_loop};
use crate::registry::StatusRegistry;
use crate::sound;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tux_protocol::{INVALID_STATUS_ID, Resource, StatusId, StatusRecord, UNDEFINED};

/// 复位到中立姿态的命令序列
const RESET_POSITIONS_MACRO: &str = "\
open_eyes 0.0
close_mouth 0.3
flippers_down 0.0
stop_spinning 0.0
TUX_CMD:LED:ON:LED_BOTH,1.0 0.0
";

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        // 旁路线程负责 join，超时后它会在目标线程结束时自行退出
        spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 运行中的 IO 线程
struct WorkerHandle {
    ctrl_tx: Sender<WorkerRequest>,
    thread: JoinHandle<()>,
}

/// Tux Droid 驱动（对外 API）
///
/// 所有方法都可以从任意线程并发调用；入队和读状态从不等待硬件。
pub struct TuxDriver {
    ctx: Arc<DriverContext>,
    /// 硬件链路；IO 线程运行期间由它独占锁定
    link: Option<Arc<Mutex<BoxedLink>>>,
    config: DriverConfig,
    state: AtomicLifecycle,
    /// 生命周期操作（start / stop）在这把锁内串行执行
    worker: Mutex<Option<WorkerHandle>>,
    log_guard: OnceLock<Option<WorkerGuard>>,
}

impl TuxDriver {
    /// 创建无硬件模式的驱动
    pub fn new(config: DriverConfig) -> Self {
        Self::from_parts(None, config)
    }

    /// 创建带硬件链路的驱动（未启动）
    pub fn with_link(link: BoxedLink, config: DriverConfig) -> Self {
        Self::from_parts(Some(link), config)
    }

    pub(crate) fn from_parts(link: Option<BoxedLink>, config: DriverConfig) -> Self {
        Self {
            ctx: Arc::new(DriverContext::new(config.stack_capacity)),
            link: link.map(|link| Arc::new(Mutex::new(link))),
            config,
            state: AtomicLifecycle::new(LifecycleState::Stopped),
            worker: Mutex::new(None),
            log_guard: OnceLock::new(),
        }
    }

    /// 启动驱动
    ///
    /// 已在运行时为空操作。带链路时启动 IO 线程并等待握手完成，
    /// 握手成功后才进入 Running。
    ///
    /// # 错误
    ///
    /// - `DriverError::Timeout`：握手未在 `handshake_timeout` 内完成
    /// - `DriverError::Link`：握手被拒绝
    /// - `DriverError::IoThread`：无法创建 IO 线程
    pub fn start(&self) -> Result<(), DriverError> {
        self.log_guard
            .get_or_init(|| logging::init_logging(&self.config.log));

        let mut worker = self.worker.lock();
        if self.state.get().is_running() {
            debug!("Driver already running");
            return Ok(());
        }

        let Some(link) = &self.link else {
            self.state.set(LifecycleState::Running);
            info!("No dongle link configured, running without hardware");
            return Ok(());
        };

        // 上一次超时未退出的 IO 线程
        if let Some(previous) = worker.take() {
            drop(previous.ctrl_tx);
            if previous.thread.join_timeout(self.config.stop_grace()).is_err() {
                warn!("Previous IO thread is still running");
            }
        }

        self.state.set(LifecycleState::Starting);
        let (ctrl_tx, ctrl_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);
        let ctx = self.ctx.clone();
        let link = link.clone();
        let pipeline = PipelineConfig::from(&self.config);
        let lock_timeout = self.config.stop_grace();

        let thread = std::thread::Builder::new()
            .name("tux-io".to_string())
            .spawn(move || {
                let Some(mut guard) = link.try_lock_for(lock_timeout) else {
                    let _ = ready_tx.send(Err(DriverError::Timeout("link owned by previous IO thread")));
                    return;
                };
                io_loop(&mut guard, ctrl_rx, ready_tx, ctx, pipeline);
            })
            .map_err(|e| {
                self.state.set(LifecycleState::Stopped);
                DriverError::IoThread(e.to_string())
            })?;

        let wait = self.config.handshake_timeout() + self.config.stop_grace();
        match ready_rx.recv_timeout(wait) {
            Ok(Ok(())) => {
                *worker = Some(WorkerHandle { ctrl_tx, thread });
                self.state.set(LifecycleState::Running);
                info!("Driver started");
                Ok(())
            },
            Ok(Err(e)) => {
                let _ = thread.join_timeout(self.config.stop_grace());
                self.state.set(LifecycleState::Stopped);
                error!("Driver start failed: {}", e);
                Err(e)
            },
            Err(RecvTimeoutError::Timeout) => {
                // 握手返回后线程发现无人接收就退出；句柄留待下次 start 回收
                drop(ready_rx);
                let _ = ctrl_tx.send(WorkerRequest::Stop);
                *worker = Some(WorkerHandle { ctrl_tx, thread });
                self.state.set(LifecycleState::Stopped);
                error!("Dongle handshake did not complete within {:?}", wait);
                Err(DriverError::Timeout("handshake"))
            },
            Err(RecvTimeoutError::Disconnected) => {
                self.state.set(LifecycleState::Stopped);
                Err(DriverError::IoThread("IO thread exited during handshake".to_string()))
            },
        }
    }

    /// 停止驱动
    ///
    /// IO 线程完成当前命令后退出，不再下发后续命令；排队命令保留，
    /// 下一次 `start()` 从断点继续。未运行时为空操作。
    ///
    /// # 错误
    ///
    /// IO 线程未在 `stop_grace` 内退出时返回 `DriverError::Timeout`，
    /// 此时驱动仍进入 Stopped。
    pub fn stop(&self) -> Result<(), DriverError> {
        let mut worker = self.worker.lock();
        if self.state.get() == LifecycleState::Stopped {
            return Ok(());
        }
        self.state.set(LifecycleState::Stopping);

        let result = match worker.take() {
            Some(WorkerHandle { ctrl_tx, thread }) => {
                let _ = ctrl_tx.send(WorkerRequest::Stop);
                drop(ctrl_tx);
                thread.join_timeout(self.config.stop_grace()).map_err(|_| {
                    error!(
                        "IO thread panicked or failed to shut down within {:?}",
                        self.config.stop_grace()
                    );
                    DriverError::Timeout("stop")
                })
            },
            None => Ok(()),
        };

        self.ctx.stack.set_enabled(false);
        self.state.set(LifecycleState::Stopped);
        info!("Driver stopped ({} commands kept)", self.ctx.stack.len());
        result
    }

    /// 运行中 IO 线程的控制通道
    ///
    /// 事件处理函数运行在 IO 线程上，不能等待 IO 线程自己的应答。
    fn worker_sender(&self, operation: &'static str) -> Result<Sender<WorkerRequest>, DriverError> {
        if !self.state.get().is_running() {
            return Err(DriverError::LinkUnavailable);
        }
        let guard = self.worker.lock();
        let handle = guard.as_ref().ok_or(DriverError::LinkUnavailable)?;
        if handle.thread.thread().id() == std::thread::current().id() {
            return Err(DriverError::IoThread(format!(
                "{operation} cannot be requested from an event handler"
            )));
        }
        Ok(handle.ctrl_tx.clone())
    }

    /// 向 IO 线程发送请求并等待应答
    fn request<F>(&self, operation: &'static str, build: F) -> Result<(), DriverError>
    where
        F: FnOnce(Sender<Result<(), DriverError>>) -> WorkerRequest,
    {
        let sender = self.worker_sender(operation)?;
        let (reply_tx, reply_rx) = bounded(1);
        sender
            .send(build(reply_tx))
            .map_err(|_| DriverError::IoThread("IO thread has exited".to_string()))?;
        match reply_rx.recv_timeout(self.config.handshake_timeout() + self.config.stop_grace()) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(DriverError::Timeout(operation)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(DriverError::IoThread("IO thread has exited".to_string()))
            },
        }
    }

    /// 逻辑复位 dongle 链路
    ///
    /// 排队命令保留；连接相关通道先标记为 stale，随后依次触发
    /// OnDongleDisconnected 和（链路恢复后的）OnDongleConnected。
    ///
    /// # 错误
    ///
    /// - `DriverError::LinkUnavailable`：没有运行中的链路
    /// - `DriverError::Timeout`：复位握手超时
    /// - `DriverError::IoThread`：在事件处理函数里调用
    pub fn reset_dongle(&self) -> Result<(), DriverError> {
        self.request("dongle reset", |reply| WorkerRequest::ResetDongle { reply })
    }

    fn ensure_parser_enabled(&self) -> Result<(), DriverError> {
        if self.ctx.stack.is_enabled() {
            Ok(())
        } else {
            Err(DriverError::ParserDisabled)
        }
    }

    /// 解析指令并入队
    ///
    /// # 参数
    ///
    /// - `text`: 指令文本，例如 `open_mouth` 或 `TUX_CMD:EYES:ON:2,OPEN`
    /// - `delay`: 与上一条命令完成之间的最小间隔（秒）
    ///
    /// # 错误
    ///
    /// `ParserDisabled` / `InvalidCommand` / `InvalidParameter` / `StackOverflow` / `Busy`
    pub fn push(&self, text: &str, delay: f64) -> Result<(), DriverError> {
        self.ensure_parser_enabled()?;
        let command = Command::parse(text, delay)?;
        self.push_command(command)
    }

    /// 入队一条已解析的命令
    pub fn push_command(&self, command: Command) -> Result<(), DriverError> {
        let result = self.ctx.stack.push(command);
        let metrics = &self.ctx.metrics;
        match &result {
            Ok(()) => DriverMetrics::incr(&metrics.commands_pushed),
            Err(DriverError::StackOverflow { .. }) => DriverMetrics::incr(&metrics.stack_overflows),
            Err(DriverError::Busy(_)) => DriverMetrics::incr(&metrics.busy_rejections),
            Err(_) => {},
        }
        result
    }

    /// 解析宏文本并逐条入队，返回入队条数
    ///
    /// 解析失败时不入队任何命令；入队中途失败时已入队的前缀保留。
    pub fn perform_macro_text(&self, text: &str) -> Result<usize, DriverError> {
        self.ensure_parser_enabled()?;
        let commands = macros::parse_text(text)?;
        macros::enqueue(commands, |command| self.push_command(command))
    }

    /// 读取宏文件并逐条入队
    pub fn perform_macro_file(&self, path: impl AsRef<Path>) -> Result<usize, DriverError> {
        self.ensure_parser_enabled()?;
        let commands = macros::parse_file(path)?;
        macros::enqueue(commands, |command| self.push_command(command))
    }

    /// 队列中的中立姿态序列：睁眼、闭嘴、鳍放下、停止旋转、点亮双眼 LED
    pub fn reset_positions(&self) -> Result<(), DriverError> {
        self.perform_macro_text(RESET_POSITIONS_MACRO).map(|_| ())
    }

    /// 清空命令栈，返回丢弃的命令数
    pub fn clear(&self) -> usize {
        let dropped = self.ctx.stack.clear();
        debug!("Cleared {} queued commands", dropped);
        dropped
    }

    /// 请求声音闪存编程
    ///
    /// # 参数
    ///
    /// - `tracks`: 以 `|` 分隔的 WAV 文件路径
    ///
    /// # 错误
    ///
    /// - `DriverError::LinkUnavailable`：没有运行中的链路
    /// - `DriverError::Busy`：正在编程或正在播放闪存声音
    /// - `FileError` / `BadFormat` / `SizeExceeded`：曲目校验失败
    /// - `DriverError::IoThread`：在事件处理函数里调用
    pub fn sound_reflash(&self, tracks: &str) -> Result<(), DriverError> {
        self.worker_sender("sound reflash")?;
        let resources = self.ctx.stack.resources();
        if !resources.try_acquire(Resource::FlashProgramming) {
            DriverMetrics::incr(&self.ctx.metrics.busy_rejections);
            return Err(DriverError::Busy(Resource::FlashProgramming));
        }
        let plan = match sound::plan_reflash(tracks) {
            Ok(plan) => plan,
            Err(e) => {
                resources.release(Resource::FlashProgramming);
                return Err(e);
            },
        };

        let dropped = self.ctx.stack.clear();
        debug!("Sound reflash discarded {} queued commands", dropped);
        let result = self.request("sound reflash", |reply| WorkerRequest::SoundReflash {
            plan,
            reply,
        });
        if result.is_err() {
            resources.release(Resource::FlashProgramming);
        }
        result
    }

    /// 独占资源是否被占用
    pub fn is_busy(&self, resource: Resource) -> bool {
        self.ctx.stack.resources().is_busy(resource)
    }

    // ============================================================
    // 状态读取（哨兵约定）
    // ============================================================

    /// 状态名 → ID，无硬件或未知名称返回 -1
    pub fn status_id(&self, name: &str) -> i32 {
        if self.link.is_none() {
            return INVALID_STATUS_ID;
        }
        self.ctx
            .registry
            .resolve_id(name)
            .map_or(INVALID_STATUS_ID, StatusId::raw)
    }

    /// ID → 状态名，无硬件或 ID 越界返回 `"UNDEFINED"`
    pub fn status_name(&self, id: i64) -> String {
        if self.link.is_none() {
            return UNDEFINED.to_string();
        }
        self.ctx
            .registry
            .resolve_name(id)
            .map_or_else(|_| UNDEFINED.to_string(), str::to_string)
    }

    /// 通道值文本，无硬件、未知名称或尚无值时返回 `"UNDEFINED"`
    pub fn status_value(&self, name: &str) -> String {
        if self.link.is_none() {
            return UNDEFINED.to_string();
        }
        match self.ctx.registry.resolve_id(name) {
            Ok(id) => self.ctx.registry.value_text(id),
            Err(_) => UNDEFINED.to_string(),
        }
    }

    /// 单通道的 `name:type:value:delay` 文本，无硬件或 ID 越界返回 `"UNDEFINED"`
    pub fn status_state(&self, id: i64) -> String {
        match StatusId::new(id) {
            Some(id) if self.link.is_some() => self.ctx.registry.state_text(id),
            _ => UNDEFINED.to_string(),
        }
    }

    /// 单通道的结构化记录
    pub fn status_record(&self, id: i64) -> Result<StatusRecord, DriverError> {
        let id = StatusId::new(id).ok_or(DriverError::InvalidIdentifier(id))?;
        Ok(self.ctx.registry.record(id))
    }

    /// 全部通道的快照文本，无硬件返回空字符串
    pub fn all_status_text(&self) -> String {
        if self.link.is_none() {
            return String::new();
        }
        self.ctx.registry.get_all_as_text()
    }

    /// 状态注册表（`Result` 风格的原始接口）
    pub fn registry(&self) -> Arc<StatusRegistry> {
        self.ctx.registry.clone()
    }

    // ============================================================
    // 事件
    // ============================================================

    pub fn events(&self) -> &EventDispatcher {
        &self.ctx.events
    }

    /// 注册状态变化处理函数
    ///
    /// 所有事件处理函数都在 IO 线程上同步调用。在处理函数里调用
    /// `reset_dongle()` / `sound_reflash()` 会立即返回 `DriverError::IoThread`，
    /// 调用 `stop()` 则要等到 `stop_grace` 超时。
    pub fn on_status<F>(&self, handler: F)
    where
        F: Fn(&StatusRecord) + Send + Sync + 'static,
    {
        self.ctx.events.set_status_handler(handler);
    }

    pub fn on_end_cycle<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ctx.events.set_end_cycle_handler(handler);
    }

    pub fn on_dongle_connected<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ctx.events.set_dongle_connected_handler(handler);
    }

    pub fn on_dongle_disconnected<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ctx.events.set_dongle_disconnected_handler(handler);
    }

    // ============================================================
    // 其他
    // ============================================================

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state.get().is_running()
    }

    /// 是否配置了硬件链路
    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    /// 排队中的命令数
    pub fn pending_commands(&self) -> usize {
        self.ctx.stack.len()
    }

    pub fn stack_capacity(&self) -> usize {
        self.ctx.stack.capacity()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

impl Drop for TuxDriver {
    fn drop(&mut self) {
        if self.state.get() != LifecycleState::Stopped
            && let Err(e) = self.stop()
        {
            error!("Failed to stop driver on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tux_link::{LinkAdapter, LinkError};
    use tux_protocol::{LinkEvent, TuxFrame};

    // 握手成功但从不上报的链路
    struct MockLink;

    impl LinkAdapter for MockLink {
        fn handshake(&mut self, _timeout: Duration) -> Result<(), LinkError> {
            Ok(())
        }

        fn send(&mut self, _frame: TuxFrame) -> Result<(), LinkError> {
            Ok(())
        }

        fn poll(&mut self) -> Result<Option<LinkEvent>, LinkError> {
            Ok(None)
        }
    }

    fn quiet_config() -> DriverConfig {
        let mut config = DriverConfig::default();
        config.log.level = crate::config::LogLevel::None;
        config
    }

    #[test]
    fn test_join_timeout_finished_thread() {
        let handle = spawn(|| 42);
        assert!(handle.join_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_join_timeout_expires() {
        let handle = spawn(|| std::thread::sleep(Duration::from_millis(300)));
        assert!(handle.join_timeout(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_start_stop_with_mock_link() {
        let driver = TuxDriver::with_link(Box::new(MockLink), quiet_config());
        driver.start().unwrap();
        assert_eq!(driver.state(), LifecycleState::Running);
        driver.push("open_mouth", 0.0).unwrap();
        driver.stop().unwrap();
        assert_eq!(driver.state(), LifecycleState::Stopped);
        assert!(matches!(
            driver.push("open_mouth", 0.0),
            Err(DriverError::ParserDisabled)
        ));
    }

    #[test]
    fn test_start_is_idempotent() {
        let driver = TuxDriver::with_link(Box::new(MockLink), quiet_config());
        driver.start().unwrap();
        driver.start().unwrap();
        assert!(driver.is_running());
    }

    #[test]
    fn test_reset_dongle_requires_running_link() {
        let driver = TuxDriver::new(quiet_config());
        driver.start().unwrap();
        assert!(matches!(driver.reset_dongle(), Err(DriverError::LinkUnavailable)));
    }

    #[test]
    fn test_status_record_out_of_range() {
        let driver = TuxDriver::new(quiet_config());
        assert!(matches!(
            driver.status_record(99),
            Err(DriverError::InvalidIdentifier(99))
        ));
        let record = driver.status_record(16).unwrap();
        assert_eq!(record.name, "battery_level");
        assert_eq!(record.value, None);
    }
}
