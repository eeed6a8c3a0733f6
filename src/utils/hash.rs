use md5::{Digest, Md5};

// id derived from the stored name, not the file content
pub fn filename_md5_hex(filename: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(filename.as_bytes());

    let hash_result = hasher.finalize();
    hex::encode(hash_result)
}
