//! 协议常量定义

/// 状态目录中的通道数量
pub const STATUS_COUNT: usize = 41;

/// 完整状态快照的最大字节数
pub const ALL_STATUS_BUFFER_LEN: usize = 8182;

/// 单通道状态查询的最大字节数
pub const STATUS_BUFFER_LEN: usize = 256;

/// 状态记录字段分隔符
pub const FIELD_SEPARATOR: char = ':';

/// 状态记录之间的分隔符
pub const RECORD_SEPARATOR: char = '\n';

/// 无硬件或未知值时读接口返回的哨兵字符串
pub const UNDEFINED: &str = "UNDEFINED";

/// 无硬件或未知名称时 ID 查询返回的哨兵值
pub const INVALID_STATUS_ID: i32 = -1;

/// 命令栈默认深度
pub const DEFAULT_STACK_CAPACITY: usize = 512;

/// 指令最多拆分的 token 数
pub const MAX_TOKENS: usize = 32;

/// `RAW_CMD` 携带的字节数
pub const RAW_COMMAND_LEN: usize = 5;

/// 声音闪存最多可用的块数
pub const SOUND_FLASH_MAX_BLOCKS: u32 = 127;

/// 声音闪存一个块对应的 PCM 字节数
pub const SOUND_FLASH_BLOCK_BYTES: u64 = 4000;

/// WAV 文件头长度
pub const WAV_HEADER_LEN: u64 = 44;

/// 驱动符号版本前缀
pub const DRIVER_VERSION_PREFIX: &str = "libtuxdriver_";
