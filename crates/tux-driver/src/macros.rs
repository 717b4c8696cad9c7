//! 宏解释器
//!
//! 宏文本每行一条命令，支持两种写法：
//!
//! ```text
//! # 注释行
//! open_mouth 0.0
//! close_mouth 1.0
//! 0.5:TUX_CMD:EYES:OPEN
//! ```
//!
//! 空行和 `#` 开头的行被忽略。解析在第一个错误处停止，不产生任何命令；
//! 入队阶段栈满时，已入队的前缀保留，不回滚。

use crate::command::Command;
use crate::error::DriverError;
use std::path::Path;
use tracing::debug;

/// 解析宏文本
///
/// # 错误
///
/// 任意一行无法解析时返回 `DriverError::Parse`，`line` 从 1 开始计数。
pub fn parse_text(text: &str) -> Result<Vec<Command>, DriverError> {
    let mut commands = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let parsed = parse_line(line).map_err(|reason| DriverError::Parse {
            line: index + 1,
            reason,
        })?;
        commands.extend(parsed);
    }
    Ok(commands)
}

/// 读取并解析宏文件
///
/// # 错误
///
/// - 文件缺失或不可读：`DriverError::File`
/// - 内容无法解析：`DriverError::Parse`
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Command>, DriverError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DriverError::File {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded macro file {:?} ({} bytes)", path, text.len());
    parse_text(&text)
}

/// 按顺序逐条调用 `push` 入队，返回入队条数
///
/// # 错误
///
/// 第一次 `push` 失败时立即返回该错误，之前已入队的命令保留在栈中。
pub fn enqueue<F>(commands: Vec<Command>, mut push: F) -> Result<usize, DriverError>
where
    F: FnMut(Command) -> Result<(), DriverError>,
{
    let total = commands.len();
    for (pushed, command) in commands.into_iter().enumerate() {
        if let Err(e) = push(command) {
            debug!("Macro enqueue stopped after {}/{} commands: {}", pushed, total, e);
            return Err(e);
        }
    }
    Ok(total)
}

fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    // `<delay>:<instruction>`
    if let Some((head, rest)) = line.split_once(':')
        && let Ok(delay) = head.trim().parse::<f64>()
    {
        return build(rest, delay).map(Some);
    }

    // `<instruction> [<delay>]`
    let Some((head, tail)) = line.rsplit_once(char::is_whitespace) else {
        return build(line, 0.0).map(Some);
    };
    let head = head.trim_end();
    // 参数列表在逗号后可以带空白（例如 `LED_BOTH, 1.0`）
    if head.ends_with(',') {
        return build(line, 0.0).map(Some);
    }

    match tail.parse::<f64>() {
        Ok(delay) => build(head, delay)
            .or_else(|reason| Command::parse(line, 0.0).map_err(|_| reason))
            .map(Some),
        Err(_) => match Command::parse(line, 0.0) {
            Ok(command) => Ok(Some(command)),
            Err(_) if Command::parse(head, 0.0).is_ok() => {
                Err(format!("malformed delay field {tail:?}"))
            },
            Err(e) => Err(e.to_string()),
        },
    }
}

fn build(instruction: &str, delay: f64) -> Result<Command, String> {
    Command::parse(instruction.trim(), delay).map_err(|e| e.to_string())
}
