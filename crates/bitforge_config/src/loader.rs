//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "bitforge.toml";

/// Loads and validates a `bitforge.toml` configuration from a project directory.
///
/// Reads `<project_dir>/bitforge.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
    load_config_from_str(&content)
}

/// Parses and validates a `bitforge.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::Syntax(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.groups.is_empty() {
        return Err(ConfigError::MissingField("groups".to_string()));
    }
    if config.toolchain.jobs == Some(0) {
        return Err(ConfigError::Invalid(
            "toolchain.jobs must be at least 1".to_string(),
        ));
    }
    for (name, group) in &config.groups {
        // Group names become directory and file names.
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::Invalid(format!(
                "invalid group name '{name}'"
            )));
        }
        if group.target.is_empty() {
            return Err(ConfigError::MissingField(format!("groups.{name}.target")));
        }
    }
    Ok(())
}
