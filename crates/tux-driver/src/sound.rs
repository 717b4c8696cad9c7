//! 声音闪存编程请求的校验与规划
//!
//! 只负责在调用方线程上检查曲目文件并计算闪存占用，真正的擦写由传输层完成。

use crate::error::DriverError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tux_protocol::{ReflashPlan, SOUND_FLASH_BLOCK_BYTES, SOUND_FLASH_MAX_BLOCKS, WAV_HEADER_LEN};

/// 曲目列表分隔符
pub const TRACK_SEPARATOR: char = '|';

/// 解析 `a.wav|b.wav` 形式的曲目列表并生成编程计划
///
/// # 错误
///
/// - `DriverError::BadFormat`：列表为空，或某个文件不是 RIFF/WAVE
/// - `DriverError::File`：某个文件缺失或不可读
/// - `DriverError::SizeExceeded`：总块数超过 127
pub fn plan_reflash(tracks: &str) -> Result<ReflashPlan, DriverError> {
    let paths: Vec<PathBuf> = tracks
        .split(TRACK_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    if paths.is_empty() {
        return Err(DriverError::BadFormat("empty track list".to_string()));
    }

    let mut sizes = Vec::with_capacity(paths.len());
    let mut blocks = Vec::with_capacity(paths.len());
    for path in &paths {
        let size = wav_data_len(path)?;
        sizes.push(size);
        blocks.push(blocks_for(size));
    }

    let plan = ReflashPlan {
        tracks: paths,
        sizes,
        blocks,
    };
    let total = plan.total_blocks();
    if total > SOUND_FLASH_MAX_BLOCKS {
        return Err(DriverError::SizeExceeded {
            blocks: total,
            limit: SOUND_FLASH_MAX_BLOCKS,
        });
    }
    Ok(plan)
}

/// 音频数据占用的块数（向上取整）
pub fn blocks_for(data_len: u64) -> u32 {
    let blocks = data_len.div_ceil(SOUND_FLASH_BLOCK_BYTES);
    u32::try_from(blocks).unwrap_or(u32::MAX)
}

/// 校验 WAV 头并返回音频数据长度
fn wav_data_len(path: &Path) -> Result<u64, DriverError> {
    let file_error = |source| DriverError::File {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(file_error)?;
    let len = file.metadata().map_err(file_error)?.len();

    let mut header = [0u8; 12];
    let header_ok = len >= WAV_HEADER_LEN
        && file.read_exact(&mut header).is_ok()
        && &header[0..4] == b"RIFF"
        && &header[8..12] == b"WAVE";
    if !header_ok {
        return Err(DriverError::BadFormat(format!(
            "{} is not a RIFF/WAVE file",
            path.display()
        )));
    }
    Ok(len - WAV_HEADER_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn wav(data_len: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let mut header = vec![0u8; WAV_HEADER_LEN as usize];
        header[0..4].copy_from_slice(b"RIFF");
        header[8..12].copy_from_slice(b"WAVE");
        file.write_all(&header).unwrap();
        file.write_all(&vec![0x80; data_len]).unwrap();
        file
    }

    #[test]
    fn test_blocks_round_up() {
        assert_eq!(blocks_for(0), 0);
        assert_eq!(blocks_for(1), 1);
        assert_eq!(blocks_for(4000), 1);
        assert_eq!(blocks_for(4001), 2);
    }

    #[test]
    fn test_plan_two_tracks() {
        let a = wav(4000);
        let b = wav(9000);
        let list = format!("{} | {}", a.path().display(), b.path().display());
        let plan = plan_reflash(&list).unwrap();
        assert_eq!(plan.tracks.len(), 2);
        assert_eq!(plan.blocks, vec![1, 3]);
        assert_eq!(plan.sizes, vec![4000, 9000]);
        assert_eq!(plan.total_blocks(), 4);
    }

    #[test]
    fn test_empty_list_is_bad_format() {
        assert!(matches!(plan_reflash(" | "), Err(DriverError::BadFormat(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = plan_reflash("/nonexistent/track.wav").unwrap_err();
        assert!(matches!(err, DriverError::File { .. }));
    }

    #[test]
    fn test_not_a_wave_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 100]).unwrap();
        let err = plan_reflash(&file.path().display().to_string()).unwrap_err();
        assert!(matches!(err, DriverError::BadFormat(_)));
        assert_eq!(err.code(), 260);
    }

    #[test]
    fn test_size_exceeded() {
        let big = wav(128 * 4000);
        let err = plan_reflash(&big.path().display().to_string()).unwrap_err();
        assert!(matches!(
            err,
            DriverError::SizeExceeded {
                blocks: 128,
                limit: 127
            }
        ));
    }
}
