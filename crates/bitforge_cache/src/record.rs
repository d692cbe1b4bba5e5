//! Dependency record store.
//!
//! One record per source file, stored as `<dir>/<name>.dep`: the absolute
//! header paths discovered for that source, one per line, with no trailing
//! metadata. A missing record means "unknown" and the source must be treated
//! as stale.

use std::path::{Path, PathBuf};

use bitforge_common::{HeaderSet, SourceFile};

use crate::error::CacheError;
use crate::fs::{remove_if_exists, write_atomic};

/// File extension for dependency records.
pub const RECORD_EXT: &str = "dep";

/// Reads and writes per-source dependency records in one directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Creates a store rooted at `dir`. The directory is created lazily.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for the source with logical name `name`.
    pub fn path_for_name(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{RECORD_EXT}"))
    }

    /// Path of the record for `source`.
    pub fn record_path(&self, source: &SourceFile) -> PathBuf {
        self.path_for_name(source.name())
    }

    /// Loads the recorded header set for `source`.
    ///
    /// Returns `None` if no record exists or it cannot be read.
    pub fn load(&self, source: &SourceFile) -> Option<HeaderSet> {
        let content = std::fs::read_to_string(self.record_path(source)).ok()?;
        Some(parse_record(&content))
    }

    /// Replaces the record for `source` with `headers`.
    pub fn store(&self, source: &SourceFile, headers: &HeaderSet) -> Result<PathBuf, CacheError> {
        let path = self.record_path(source);
        for header in multiline_headers(headers) {
            tracing::warn!(
                record = %path.display(),
                header = ?header,
                "header name contains a newline and will not survive reload; unit will be re-extracted every run"
            );
        }
        write_atomic(&path, format_record(headers).as_bytes())?;
        tracing::debug!(record = %path.display(), headers = headers.len(), "stored dependency record");
        Ok(path)
    }

    /// Deletes the record for logical name `name`, if present.
    pub fn remove(&self, name: &str) -> Result<bool, CacheError> {
        remove_if_exists(&self.path_for_name(name))
    }
}

/// Serializes a header set in the record format.
pub fn format_record(headers: &HeaderSet) -> String {
    headers
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Headers the line-based record format cannot hold as a single entry.
pub fn multiline_headers(headers: &HeaderSet) -> impl Iterator<Item = &Path> {
    headers
        .iter()
        .map(PathBuf::as_path)
        .filter(|p| p.to_string_lossy().contains('\n'))
}

/// Parses the record format. Blank lines are ignored.
pub fn parse_record(content: &str) -> HeaderSet {
    content
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}
