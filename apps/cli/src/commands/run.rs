//! run 命令
//!
//! 在模拟 dongle 上执行宏文件，打印状态事件

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tux_driver::{DriverConfig, TuxDriverBuilder};
use tux_link::SimulatedLink;

/// 宏执行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 宏文件路径
    pub macro_file: PathBuf,

    /// 最长运行时间（毫秒）
    #[arg(long, default_value_t = 10_000)]
    pub duration_ms: u64,
}

impl RunCommand {
    /// 执行到命令栈清空、超时或 Ctrl-C
    pub fn execute(&self, config: DriverConfig) -> Result<()> {
        let interrupted = Arc::new(AtomicBool::new(false));
        {
            let interrupted = interrupted.clone();
            ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
                .context("Failed to set Ctrl-C handler")?;
        }

        let settle = config.poll_interval() * 5;
        let driver = TuxDriverBuilder::new()
            .config(config)
            .link(SimulatedLink::new())
            .build();
        driver.on_status(|record| println!("{record}"));
        driver.start().context("Failed to start driver")?;

        let queued = driver
            .perform_macro_file(&self.macro_file)
            .with_context(|| format!("Failed to queue macro {}", self.macro_file.display()))?;
        info!("Queued {} commands", queued);

        let deadline = Instant::now() + Duration::from_millis(self.duration_ms);
        while driver.pending_commands() > 0
            && Instant::now() < deadline
            && !interrupted.load(Ordering::SeqCst)
        {
            thread::sleep(Duration::from_millis(10));
        }
        // 最后一条命令的状态回报
        thread::sleep(settle);

        let left = driver.pending_commands();
        driver.stop().context("Failed to stop driver")?;

        let metrics = driver.metrics();
        println!(
            "dispatched {} of {} commands ({} left queued, {} failed)",
            metrics.commands_dispatched, queued, left, metrics.commands_failed
        );
        Ok(())
    }
}
