// 1 MiB
pub const MAX_FILE_SIZE: usize = 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 1920;
pub const INITIAL_JPEG_QUALITY: u8 = 95;
pub const MIN_JPEG_QUALITY: u8 = 10;
pub const JPEG_QUALITY_STEP: u8 = 5;

pub const SERVER_REQUEST_BODY_LIMIT: usize = 100 * 1024 * 1024;
pub const SERVER_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "upload_service.log";
pub const LOG_FILES_RETAINED: usize = 5;

pub const FALLBACK_STEM: &str = "file";
pub const UNIQUE_SUFFIX_LEN: usize = 8;
pub const UPLOAD_FIELD_NAME: &str = "file";
