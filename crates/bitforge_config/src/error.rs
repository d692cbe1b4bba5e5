//! Errors raised while reading `bitforge.toml` and resolving its groups.

use std::path::PathBuf;

/// Why a project configuration could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file or project root could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The file or directory that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not fit the schema.
    #[error("bitforge.toml is malformed: {0}")]
    Syntax(String),

    /// A build group was requested that the project does not define.
    #[error("no build group named '{0}' in bitforge.toml")]
    UnknownGroup(String),

    /// A required key is absent or empty.
    #[error("bitforge.toml must set `{0}`")]
    MissingField(String),

    /// A value is present but unusable.
    #[error("invalid bitforge.toml: {0}")]
    Invalid(String),
}
