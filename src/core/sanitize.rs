use crate::core::transliterate::transliterate;
use crate::utils::constants::{FALLBACK_STEM, UNIQUE_SUFFIX_LEN};
use uuid::Uuid;

// extension keeps its dot and case; a leading dot is part of the stem
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

pub fn clean_stem(stem: &str) -> String {
    let latin = transliterate(stem);

    let kept: String = latin
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let trimmed = kept.trim_matches(|c: char| c == '-' || c.is_whitespace());

    let mut cleaned = String::with_capacity(trimmed.len());
    let mut in_separator_run = false;
    for c in trimmed.chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator_run {
                cleaned.push('_');
                in_separator_run = true;
            }
        } else {
            cleaned.push(c);
            in_separator_run = false;
        }
    }

    if cleaned.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        cleaned
    }
}

fn unique_suffix() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(UNIQUE_SUFFIX_LEN);
    id
}

/// Maps a client-supplied filename to a safe on-disk name of the form
/// `<stem>_<8 hex chars><.ext>`. Only the last path component is considered.
pub fn sanitize_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, extension) = split_filename(base);

    format!("{}_{}{}", clean_stem(stem), unique_suffix(), extension)
}
