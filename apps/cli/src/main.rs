//! # Tux CLI
//!
//! Command-line interface for the Tux Droid driver.
//!
//! ```bash
//! # 状态通道文档
//! tux-cli catalog
//!
//! # 检查宏文件
//! tux-cli check blink.macro
//!
//! # 在模拟 dongle 上执行宏并打印状态事件
//! tux-cli run blink.macro --duration-ms 3000
//!
//! # 错误码说明
//! tux-cli describe 258
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tux_driver::{LogLevel, LogTarget};

mod commands;
mod config;

use commands::{CheckCommand, RunCommand};

/// Tux CLI - Tux Droid 驱动命令行工具
#[derive(Parser, Debug)]
#[command(name = "tux-cli")]
#[command(about = "Command-line interface for the Tux Droid driver", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 `<config_dir>/tux-cli/config.toml`）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别（debug / info / warning / error / none），覆盖配置文件
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// 日志输出（local / hardware），覆盖配置文件
    #[arg(long, global = true)]
    log_target: Option<LogTarget>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 打印状态通道文档
    Catalog,

    /// 解析宏文件并列出命令
    Check {
        #[command(flatten)]
        args: CheckCommand,
    },

    /// 在模拟 dongle 上执行宏
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 打印错误码的说明
    Describe {
        /// 错误码
        code: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if let Some(target) = cli.log_target {
        config.log.target = target;
    }
    let _log_guard = tux_driver::init_logging(&config.log);

    match cli.command {
        Commands::Catalog => {
            print!("{}", tux_protocol::catalog_doc());
            Ok(())
        },

        Commands::Check { args } => args.execute(),

        Commands::Run { args } => args.execute(config),

        Commands::Describe { code } => {
            println!("{}: {}", code, tux_protocol::describe(code));
            Ok(())
        },
    }
}
