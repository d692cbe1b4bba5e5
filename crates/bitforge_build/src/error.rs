//! Error types for the build pipeline.

use std::path::PathBuf;

use bitforge_cache::CacheError;
use bitforge_config::ConfigError;
use bitforge_depfile::DepfileError;
use bitforge_toolchain::ToolError;

/// Errors that abort a build group.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A dependency listing could not be parsed; the previous record is kept.
    #[error(transparent)]
    MalformedDependencyOutput(#[from] DepfileError),

    /// The compiler or linker failed or could not be started.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Writing a dependency record or stamp failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The group configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A filesystem operation on build outputs failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An include or exclude pattern is not a valid glob.
    #[error("invalid source pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two sources share a logical name and would overwrite each other's object.
    #[error(
        "sources {} and {} both produce unit '{name}'",
        first.display(),
        second.display()
    )]
    DuplicateUnitName {
        /// The shared logical name.
        name: String,
        /// The first source with that name.
        first: PathBuf,
        /// The second source with that name.
        second: PathBuf,
    },

    /// A tool exited successfully without writing its output file.
    #[error("{tool} reported success but did not produce {}", path.display())]
    MissingOutput {
        /// Executable name.
        tool: String,
        /// The expected output.
        path: PathBuf,
    },

    /// The build graph has a dependency cycle.
    #[error("build graph contains a dependency cycle")]
    Cycle,

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    Pool(String),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}
