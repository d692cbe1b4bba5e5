//! Error types for dependency listing parsing.

use std::path::PathBuf;

/// Errors produced while parsing a dependency listing.
#[derive(Debug, thiserror::Error)]
pub enum DepfileError {
    /// The listing did not start with the `<stem>.o:` rule target expected
    /// for the source file it was generated from.
    #[error(
        "malformed dependency output for {}: expected prefix `{expected_prefix}`, found `{found}`",
        source_file.display()
    )]
    MalformedDependencyOutput {
        /// The source file the listing was generated for.
        source_file: PathBuf,
        /// The rule target that was expected.
        expected_prefix: String,
        /// The beginning of the actual output.
        found: String,
    },
}
