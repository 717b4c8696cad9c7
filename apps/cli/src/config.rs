//! 配置文件加载
//!
//! 配置文件是 TOML 格式的 `DriverConfig`，所有字段都可以省略：
//!
//! ```toml
//! stack_capacity = 128
//! poll_interval_ms = 5
//!
//! [log]
//! level = "debug"
//! target = "local"
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tux_driver::DriverConfig;

/// 默认配置文件路径
pub fn default_config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("tux-cli");
    path.push("config.toml");
    Some(path)
}

/// 加载配置
///
/// 显式指定的文件必须存在；默认位置的文件不存在时使用默认配置。
pub fn load(explicit: Option<&Path>) -> Result<DriverConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_file() {
            Some(path) if path.exists() => path,
            _ => return Ok(DriverConfig::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn parse(content: &str) -> Result<DriverConfig> {
    Ok(toml::from_str(content)?)
}
