//! Atomic file replacement.

use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Returns the sibling temporary path used while `path` is being written.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `data` to `path` via a temporary sibling file and a rename.
///
/// Readers observe either the previous contents or the new ones, never a
/// truncated file. Parent directories are created as needed.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let tmp = temp_path_for(path);
    std::fs::write(&tmp, data).map_err(|e| CacheError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Removes `path` if it exists. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool, CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
