//! Locating and loading the project configuration.

use std::path::{Path, PathBuf};

use bitforge_config::{
    load_config, load_config_from_str, resolve_group, ConfigError, ProjectConfig, ResolvedGroup,
    CONFIG_FILE,
};

use crate::GlobalArgs;

/// A loaded project: its root directory and parsed configuration.
pub struct Project {
    /// Directory that relative configuration paths are resolved against.
    pub root: PathBuf,
    /// The parsed configuration.
    pub config: ProjectConfig,
}

impl Project {
    /// Loads the project selected by the global flags.
    ///
    /// `--config` may name a configuration file (its directory becomes the
    /// root) or a project directory. Without it, the current directory and
    /// its ancestors are searched for `bitforge.toml`.
    pub fn load(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        match &global.config {
            Some(path) => {
                let path = PathBuf::from(path);
                if path.is_file() {
                    let content = std::fs::read_to_string(&path)?;
                    let root = path
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from("."));
                    Ok(Self {
                        root,
                        config: load_config_from_str(&content)?,
                    })
                } else {
                    Ok(Self {
                        config: load_config(&path)?,
                        root: path,
                    })
                }
            }
            None => {
                let root = find_project_root(&std::env::current_dir()?)?;
                Ok(Self {
                    config: load_config(&root)?,
                    root,
                })
            }
        }
    }

    /// Resolves the requested group, or every group in name order.
    pub fn groups(&self, only: Option<&str>) -> Result<Vec<ResolvedGroup>, ConfigError> {
        match only {
            Some(name) => Ok(vec![resolve_group(&self.config, &self.root, name)?]),
            None => self
                .config
                .groups
                .keys()
                .map(|name| resolve_group(&self.config, &self.root, name))
                .collect(),
        }
    }
}

/// Walks up from `start` looking for a directory containing `bitforge.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = "[project]\nname = \"rt\"\n\n[groups.mm]\ntarget = \"linux_x64\"\n\n[groups.alloc]\ntarget = \"linux_x64\"\nlanguage = \"c\"\n";

    fn global(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: config.map(|p| p.display().to_string()),
        }
    }

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), CONFIG).unwrap();
        assert_eq!(find_project_root(tmp.path()).unwrap(), tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), CONFIG).unwrap();
        let sub = tmp.path().join("src/mm");
        fs::create_dir_all(&sub).unwrap();
        assert_eq!(find_project_root(&sub).unwrap(), tmp.path());
    }

    #[test]
    fn find_project_root_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = find_project_root(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("could not find bitforge.toml"));
    }

    #[test]
    fn load_from_config_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("custom.toml");
        fs::write(&file, CONFIG).unwrap();
        let project = Project::load(&global(Some(&file))).unwrap();
        assert_eq!(project.root, tmp.path());
        assert_eq!(project.config.project.name, "rt");
    }

    #[test]
    fn load_from_config_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), CONFIG).unwrap();
        let project = Project::load(&global(Some(tmp.path()))).unwrap();
        assert_eq!(project.root, tmp.path());
    }

    #[test]
    fn groups_all_or_one() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), CONFIG).unwrap();
        let project = Project::load(&global(Some(tmp.path()))).unwrap();

        let all: Vec<String> = project.groups(None).unwrap().into_iter().map(|g| g.name).collect();
        assert_eq!(all, vec!["alloc", "mm"]);
        assert_eq!(project.groups(Some("mm")).unwrap()[0].name, "mm");
        assert!(matches!(
            project.groups(Some("gc")),
            Err(ConfigError::UnknownGroup(_))
        ));
    }
}
