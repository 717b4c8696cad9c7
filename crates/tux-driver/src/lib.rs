//! 驱动层模块
//!
//! 本模块提供 Tux Droid 的驱动核心，包括：
//! - IO 线程管理（握手、轮询状态、按延迟下发命令）
//! - 状态注册表（ArcSwap 无锁读取）
//! - 有界命令栈与独占资源跟踪
//! - 宏解释器
//! - 事件回调（状态变化、循环结束、dongle 插拔）
//! - 声音闪存编程请求
//!
//! # 使用场景
//!
//! 通过 [`TuxDriverBuilder`] 构造 [`TuxDriver`]，`start()` 之后即可入队命令、读取状态。
//! 没有链路时驱动运行在无硬件模式，所有读接口返回哨兵值。

mod builder;
pub mod command;
pub mod config;
mod driver;
mod error;
pub mod events;
pub mod heartbeat;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod mode;
pub mod pipeline;
pub mod registry;
pub mod resources;
pub mod sound;
pub mod stack;

pub use builder::TuxDriverBuilder;
pub use command::Command;
pub use config::{DriverConfig, LogConfig, LogLevel, LogTarget};
pub use driver::TuxDriver;
pub use error::DriverError;
pub use events::{Event, EventClass, EventDispatcher, NotifyHandler, StatusHandler};
pub use heartbeat::ConnectionMonitor;
pub use logging::init_logging;
pub use metrics::{DriverMetrics, MetricsSnapshot};
pub use mode::{AtomicLifecycle, LifecycleState};
pub use pipeline::{BoxedLink, DriverContext, PipelineConfig, io_loop};
pub use registry::{StatusRegistry, StatusValue, UpdateOutcome};
pub use resources::ResourceTracker;
pub use stack::CommandStack;

// 常用的协议与链路类型
pub use tux_link::{LinkAdapter, LinkError, SimHandle, SimulatedLink};
pub use tux_protocol::{ErrorCode, Instruction, ReflashPlan, Resource, StatusId, StatusRecord, describe};
