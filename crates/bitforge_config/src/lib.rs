//! Parsing and validation of `bitforge.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`], then resolves one build group into a [`ResolvedGroup`]
//! with absolute paths and defaults filled in.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{default_excludes, default_includes, resolve_group, ResolvedGroup};
pub use types::*;
