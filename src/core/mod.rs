pub mod mime;
pub mod recompress;
pub mod sanitize;
pub mod storage;
pub mod transliterate;
