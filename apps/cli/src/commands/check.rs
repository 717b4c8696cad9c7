//! check 命令
//!
//! 解析宏文件，不连接硬件

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tux_driver::macros;

/// 宏检查命令参数
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// 宏文件路径
    pub macro_file: PathBuf,
}

impl CheckCommand {
    pub fn execute(&self) -> Result<()> {
        let commands = macros::parse_file(&self.macro_file)
            .with_context(|| format!("Invalid macro {}", self.macro_file.display()))?;

        for (index, command) in commands.iter().enumerate() {
            println!("{:>4}  {}", index + 1, command);
        }
        println!("{} commands OK", commands.len());
        Ok(())
    }
}
