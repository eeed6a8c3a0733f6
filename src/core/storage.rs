use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Resolves `<folder>/<file_name>` without any normalisation. A name holding
/// `..` segments or an absolute path points outside the folder.
pub fn resolve_path(folder: &Path, file_name: &str) -> PathBuf {
    folder.join(file_name)
}

// size is read back from disk
pub async fn write_file(folder: &Path, file_name: &str, bytes: &[u8]) -> io::Result<(PathBuf, u64)> {
    fs::create_dir_all(folder).await?;

    let path = resolve_path(folder, file_name);
    fs::write(&path, bytes).await?;
    let size = fs::metadata(&path).await?.len();

    Ok((path, size))
}

// Ok(false) when there is no regular file to delete
pub async fn delete_file(folder: &Path, file_name: &str) -> io::Result<bool> {
    let path = resolve_path(folder, file_name);

    match fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {
            fs::remove_file(&path).await?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
