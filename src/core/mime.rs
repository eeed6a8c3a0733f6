const FALLBACK_BINARY_MIME: &str = "application/octet-stream";
const FALLBACK_TEXT_MIME: &str = "text/plain";

pub fn detect_mime(bytes: &[u8]) -> String {
    match infer::get(bytes) {
        Some(kind) => kind.mime_type().to_string(),
        None if std::str::from_utf8(bytes).is_ok() => FALLBACK_TEXT_MIME.to_string(),
        None => FALLBACK_BINARY_MIME.to_string(),
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}
