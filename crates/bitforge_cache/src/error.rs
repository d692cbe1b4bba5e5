//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while writing incremental-build state.
///
/// Reads never fail: unreadable state is reported as a cache miss. This enum
/// covers the write side, where losing a record or stamp silently would make
/// the next build trust stale outputs.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
