//! Persistent incremental-build state.
//!
//! Two kinds of artifacts live next to the build outputs:
//!
//! - **Dependency records** (`<name>.dep`): the header set discovered for one
//!   source file, as a newline-separated list of absolute paths.
//! - **Build stamps** (`<output>.stamp`): the change signals of every input
//!   and the command hash observed when an output was last built successfully.
//!
//! All reads are fail-safe: a missing or corrupt file reads as `None`, which
//! callers treat as "stale".

#![warn(missing_docs)]

pub mod error;
pub mod fs;
pub mod record;
pub mod stamp;

pub use error::CacheError;
pub use record::RecordStore;
pub use stamp::BuildStamp;
