//! Pipeline IO 循环模块
//!
//! 后台 IO 线程独占硬件链路，是状态注册表的唯一写者、命令栈的唯一出队者。
//! 每个循环：
//!
//! 1. 处理控制请求（停止、复位 dongle、声音闪存编程）
//! 2. 轮询上行状态，写入注册表并在锁外分发 OnStatus
//! 3. 检查链路静默
//! 4. 下发所有到期的命令
//! 5. 分发 OnEndCycle，然后可取消地等待下一个周期

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::events::{Event, EventDispatcher};
use crate::heartbeat::ConnectionMonitor;
use crate::metrics::DriverMetrics;
use crate::registry::{StatusRegistry, UpdateOutcome};
use crate::stack::CommandStack;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};
use tux_link::{LinkAdapter, LinkError};
use tux_protocol::ids::{AUDIO_FLASH_PLAY, CONNECTION_CHANNELS, DONGLE_PLUG, RF_STATE, SOUND_REFLASH_END};
use tux_protocol::{ChannelState, LinkEvent, ReflashPlan, Resource, StatusId, TuxFrame, Value};

/// 线程安全的链路句柄
pub type BoxedLink = Box<dyn LinkAdapter + Send>;

/// 驱动各组件的共享上下文
#[derive(Debug)]
pub struct DriverContext {
    pub registry: Arc<StatusRegistry>,
    pub stack: CommandStack,
    pub events: EventDispatcher,
    pub metrics: DriverMetrics,
}

impl DriverContext {
    pub fn new(stack_capacity: usize) -> Self {
        Self {
            registry: Arc::new(StatusRegistry::new()),
            stack: CommandStack::new(stack_capacity),
            events: EventDispatcher::new(),
            metrics: DriverMetrics::new(),
        }
    }

    /// 写入驱动维护的通道，必要时分发 OnStatus
    fn set_status(&self, id: StatusId, value: Value) {
        if let UpdateOutcome::Reported(record) = self.registry.set(id, value) {
            self.events.emit(&Event::Status(&record));
        }
    }
}

/// Pipeline 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 握手 / 复位超时
    pub handshake_timeout: Duration,
    /// 空闲时的轮询间隔
    pub poll_interval: Duration,
    /// 每个循环最多处理的上行帧数
    pub max_frames_per_cycle: usize,
    /// 链路静默超时
    pub link_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&DriverConfig::default())
    }
}

impl From<&DriverConfig> for PipelineConfig {
    fn from(config: &DriverConfig) -> Self {
        Self {
            handshake_timeout: config.handshake_timeout(),
            poll_interval: config.poll_interval(),
            max_frames_per_cycle: config.max_frames_per_cycle.max(1),
            link_timeout: config.link_timeout(),
        }
    }
}

/// 发往 IO 线程的控制请求
#[derive(Debug)]
pub enum WorkerRequest {
    /// 完成当前命令后退出
    Stop,
    /// 复位链路，保留排队命令
    ResetDongle {
        reply: Sender<Result<(), DriverError>>,
    },
    /// 把声音闪存编程计划交给传输层
    SoundReflash {
        plan: ReflashPlan,
        reply: Sender<Result<(), DriverError>>,
    },
}

fn link_error(err: LinkError, operation: &'static str) -> DriverError {
    match err {
        LinkError::Timeout => DriverError::Timeout(operation),
        other => DriverError::Link(other),
    }
}

/// IO 线程的运行状态
struct Worker<'a> {
    link: &'a mut BoxedLink,
    ctx: &'a DriverContext,
    config: &'a PipelineConfig,
    monitor: ConnectionMonitor,
    /// 上一条命令执行完成的时间
    last_completion: Instant,
    /// dongle 在线（拔出后停止下发命令）
    link_up: bool,
}

impl Worker<'_> {
    fn handle_request(&mut self, request: WorkerRequest) -> ControlFlow<()> {
        match request {
            WorkerRequest::Stop => return ControlFlow::Break(()),
            WorkerRequest::ResetDongle { reply } => {
                let result = self.reset_dongle();
                let _ = reply.send(result);
            },
            WorkerRequest::SoundReflash { plan, reply } => {
                let result = self.start_reflash(plan);
                let _ = reply.send(result);
            },
        }
        ControlFlow::Continue(())
    }

    fn reset_dongle(&mut self) -> Result<(), DriverError> {
        info!("Resetting dongle link");
        self.ctx.registry.mark_stale(&CONNECTION_CHANNELS);
        self.ctx.events.emit(&Event::DongleDisconnected);

        match self.link.reset(self.config.handshake_timeout) {
            Ok(()) => {
                self.on_link_up();
                Ok(())
            },
            Err(e) => {
                error!("Dongle reset failed: {}", e);
                self.link_up = false;
                self.ctx.stack.set_enabled(false);
                Err(link_error(e, "dongle reset"))
            },
        }
    }

    fn start_reflash(&mut self, plan: ReflashPlan) -> Result<(), DriverError> {
        info!(
            "Sound reflash: {} tracks, {} blocks",
            plan.tracks.len(),
            plan.total_blocks()
        );
        if !self.link_up {
            self.ctx.stack.resources().release(Resource::FlashProgramming);
            return Err(DriverError::LinkUnavailable);
        }
        self.link.send(TuxFrame::SoundReflash(plan)).map_err(|e| {
            self.ctx.stack.resources().release(Resource::FlashProgramming);
            link_error(e, "sound reflash")
        })
    }

    fn on_link_up(&mut self) {
        self.mark_link_up();
        self.ctx.events.emit(&Event::DongleConnected);
    }

    fn mark_link_up(&mut self) {
        self.link_up = true;
        self.monitor.register_feedback();
        self.ctx.set_status(DONGLE_PLUG, Value::Bool(true));
        self.ctx.stack.set_enabled(true);
    }

    fn on_link_down(&mut self) {
        if !self.link_up {
            return;
        }
        warn!("Dongle disconnected");
        self.link_up = false;
        self.ctx.stack.set_enabled(false);
        self.ctx.set_status(RF_STATE, Value::Bool(false));
        self.ctx.set_status(DONGLE_PLUG, Value::Bool(false));
        self.ctx.events.emit(&Event::DongleDisconnected);
    }

    fn poll_link(&mut self) {
        for _ in 0..self.config.max_frames_per_cycle {
            match self.link.poll() {
                Ok(Some(LinkEvent::Status(frame))) => {
                    self.monitor.register_feedback();
                    let state = ChannelState::from_wire(&frame.state);
                    let outcome = self.ctx.registry.update(frame.id, &frame.raw, state);
                    if outcome == UpdateOutcome::Rejected {
                        DriverMetrics::incr(&self.ctx.metrics.status_parse_errors);
                        continue;
                    }
                    DriverMetrics::incr(&self.ctx.metrics.status_updates);
                    self.track_resources(frame.id);
                    if let UpdateOutcome::Reported(record) = outcome {
                        self.ctx.events.emit(&Event::Status(&record));
                    }
                },
                Ok(Some(LinkEvent::DongleUnplugged)) => self.on_link_down(),
                Ok(None) => break,
                Err(e) if e.is_fatal() => {
                    error!("Link poll failed: {}", e);
                    self.on_link_down();
                    break;
                },
                Err(e) => {
                    warn!("Link poll error: {}", e);
                    break;
                },
            }
        }
    }

    /// 根据硬件上报更新独占资源占用
    fn track_resources(&self, id: StatusId) {
        let resources = self.ctx.stack.resources();
        if id == AUDIO_FLASH_PLAY {
            let playing = self
                .ctx
                .registry
                .value(id)
                .value
                .as_ref()
                .and_then(Value::as_str)
                .is_some_and(|track| track != "STOP");
            if playing {
                resources.occupy(Resource::SoundChannel);
            } else {
                resources.release(Resource::SoundChannel);
            }
        } else if id == SOUND_REFLASH_END {
            resources.release(Resource::FlashProgramming);
        }
    }

    fn check_silence(&self) {
        if self.link_up && self.monitor.take_stale() {
            warn!(
                "No status from dongle for {:?}, marking connection channels stale",
                self.monitor.time_since_last_feedback()
            );
            DriverMetrics::incr(&self.ctx.metrics.link_timeouts);
            self.ctx.registry.mark_stale(&CONNECTION_CHANNELS);
        }
    }

    /// 下发所有到期命令
    ///
    /// 每条命令执行完成后重新计时，`delay` 是相邻命令之间的最小间隔。
    fn dispatch_due(&mut self) {
        while self.link_up {
            let Some(command) = self.ctx.stack.pop_due(self.last_completion.elapsed()) else {
                break;
            };
            trace!("Dispatching {}", command);
            let result = self.link.send(TuxFrame::Command(*command.instruction()));
            self.last_completion = Instant::now();
            match result {
                Ok(()) => {
                    DriverMetrics::incr(&self.ctx.metrics.commands_dispatched);
                    if let Some(resource) = command.resource() {
                        self.ctx.stack.resources().occupy(resource);
                    }
                },
                Err(LinkError::Timeout) => {
                    DriverMetrics::incr(&self.ctx.metrics.commands_failed);
                    DriverMetrics::incr(&self.ctx.metrics.link_timeouts);
                    warn!("Dongle did not acknowledge {}", command.instruction());
                },
                Err(e) => {
                    DriverMetrics::incr(&self.ctx.metrics.commands_failed);
                    warn!("Failed to send {}: {}", command.instruction(), e);
                    if e.is_fatal() {
                        self.on_link_down();
                    }
                },
            }
        }
    }

    /// 距下一个周期的等待时间
    fn next_wait(&self) -> Duration {
        if !self.link_up {
            return self.config.poll_interval;
        }
        match self.ctx.stack.next_delay() {
            Some(delay) => delay
                .saturating_sub(self.last_completion.elapsed())
                .min(self.config.poll_interval),
            None => self.config.poll_interval,
        }
    }
}

/// IO 线程主循环
///
/// # 参数
///
/// - `link`: 硬件链路（线程退出后归还给调用方）
/// - `ctrl_rx`: 控制请求通道，发送端全部关闭时线程退出
/// - `ready_tx`: 握手结果（成功或失败都只发送一次）
/// - `ctx`: 共享上下文
/// - `config`: Pipeline 配置
pub fn io_loop(
    link: &mut BoxedLink,
    ctrl_rx: Receiver<WorkerRequest>,
    ready_tx: Sender<Result<(), DriverError>>,
    ctx: Arc<DriverContext>,
    config: PipelineConfig,
) {
    if let Err(e) = link.handshake(config.handshake_timeout) {
        error!("Dongle handshake failed: {}", e);
        let _ = ready_tx.send(Err(link_error(e, "handshake")));
        return;
    }

    let mut worker = Worker {
        link,
        ctx: ctx.as_ref(),
        config: &config,
        monitor: ConnectionMonitor::new(config.link_timeout),
        last_completion: Instant::now(),
        link_up: false,
    };
    // start() 已放弃等待时不能再宣告连接
    worker.mark_link_up();
    if ready_tx.send(Ok(())).is_err() {
        warn!("Dongle handshake completed after start() gave up, IO thread exiting");
        ctx.stack.set_enabled(false);
        return;
    }
    ctx.events.emit(&Event::DongleConnected);
    info!("IO thread started");

    'cycle: loop {
        loop {
            match ctrl_rx.try_recv() {
                Ok(request) => {
                    if worker.handle_request(request).is_break() {
                        break 'cycle;
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'cycle,
            }
        }

        worker.poll_link();
        worker.check_silence();
        worker.dispatch_due();

        DriverMetrics::incr(&ctx.metrics.cycles);
        ctx.events.emit(&Event::EndCycle);

        // 等待期间也能立刻响应 Stop
        match ctrl_rx.recv_timeout(worker.next_wait()) {
            Ok(request) => {
                if worker.handle_request(request).is_break() {
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    ctx.stack.set_enabled(false);
    debug!("{} commands left queued", ctx.stack.len());
    info!("IO thread stopped");
}
