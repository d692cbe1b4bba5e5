//! Per-file change signals.
//!
//! A [`Fingerprint`] captures whatever the configured [`ChangeDetection`] mode
//! observes about a file: its modification time and length, or its full
//! content hash. Two fingerprints of the same path compare equal exactly when
//! the file is considered unchanged.

use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Which filesystem signal is used to decide whether a file changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDetection {
    /// Modification time plus file length (default, cheap).
    #[default]
    Mtime,
    /// XXH3-128 hash of the file contents.
    Content,
}

/// The observed change signal of a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fingerprint {
    /// Modification time since the Unix epoch and length in bytes.
    Mtime {
        /// Whole seconds since the epoch.
        secs: u64,
        /// Sub-second nanoseconds.
        nanos: u32,
        /// File length in bytes.
        len: u64,
    },
    /// Hash of the file contents.
    Content(ContentHash),
}

impl Fingerprint {
    /// Observes `path` using the given detection mode.
    ///
    /// Returns `None` if the file does not exist or cannot be read. Callers
    /// treat a missing fingerprint as a change.
    pub fn of(path: &Path, mode: ChangeDetection) -> Option<Self> {
        match mode {
            ChangeDetection::Mtime => {
                let meta = std::fs::metadata(path).ok()?;
                if !meta.is_file() {
                    return None;
                }
                let since = meta.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
                Some(Fingerprint::Mtime {
                    secs: since.as_secs(),
                    nanos: since.subsec_nanos(),
                    len: meta.len(),
                })
            }
            ChangeDetection::Content => {
                let content = std::fs::read(path).ok()?;
                Some(Fingerprint::Content(ContentHash::from_bytes(&content)))
            }
        }
    }
}
