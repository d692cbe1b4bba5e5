//! Group resolution: turning one `[groups.<name>]` table into concrete paths
//! and settings.
//!
//! Resolution happens once, when a build group is set up. Every path in the
//! result is absolute and every default is filled in, so later stages never
//! consult the raw configuration again.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use bitforge_common::{ChangeDetection, SourceLanguage};
use std::path::{Path, PathBuf};

/// A fully resolved build group.
#[derive(Debug, Clone)]
pub struct ResolvedGroup {
    /// The group name.
    pub name: String,
    /// Absolute project root.
    pub project_root: PathBuf,
    /// Target platform identifier.
    pub target: String,
    /// Forced source language, if any.
    pub language: Option<SourceLanguage>,
    /// Absolute source directories.
    pub src_dirs: Vec<PathBuf>,
    /// Absolute header search directories, in search order.
    pub header_dirs: Vec<PathBuf>,
    /// Source include globs.
    pub include: Vec<String>,
    /// Source exclude globs.
    pub exclude: Vec<String>,
    /// Extra compiler arguments for the target (from `toolchain.target_args`).
    pub target_args: Vec<String>,
    /// Extra compiler arguments for this group.
    pub compiler_args: Vec<String>,
    /// Extra linker arguments for this group.
    pub linker_args: Vec<String>,
    /// Whether the link phase is skipped.
    pub skip_link: bool,
    /// Change signal used for staleness checks.
    pub change_detection: ChangeDetection,
    /// Worker pool size, if configured.
    pub jobs: Option<usize>,
    /// LLVM installation root, if configured.
    pub llvm_dir: Option<PathBuf>,
    /// Directory holding this group's objects, records and stamps.
    pub obj_dir: PathBuf,
    /// Path of the linked module.
    pub module_path: PathBuf,
}

/// Resolves the group `group_name` against `project_root`.
pub fn resolve_group(
    config: &ProjectConfig,
    project_root: &Path,
    group_name: &str,
) -> Result<ResolvedGroup, ConfigError> {
    let group = config
        .groups
        .get(group_name)
        .ok_or_else(|| ConfigError::UnknownGroup(group_name.to_string()))?;

    let root = std::path::absolute(project_root).map_err(|source| ConfigError::Read {
        path: project_root.to_path_buf(),
        source,
    })?;
    let absolutize = |p: &str| -> PathBuf {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    };

    let src_dirs = match &group.src_dirs {
        Some(dirs) => dirs.iter().map(|d| absolutize(d)).collect(),
        None => vec![root.join("src").join(group_name).join("cpp")],
    };
    let header_dirs = match &group.header_dirs {
        Some(dirs) => dirs.iter().map(|d| absolutize(d)).collect(),
        None => vec![root.join("src").join(group_name).join("headers")],
    };
    let include = group
        .include
        .clone()
        .unwrap_or_else(|| default_includes(group.language));
    let exclude = group
        .exclude
        .clone()
        .unwrap_or_else(|| default_excludes(group.language));

    // <build>/bitcode/<output_group>/<target>/<group>/ and <group>.bc beside it
    let target_dir = absolutize(&config.project.build_dir)
        .join("bitcode")
        .join(&group.output_group)
        .join(&group.target);

    Ok(ResolvedGroup {
        name: group_name.to_string(),
        project_root: root.clone(),
        target: group.target.clone(),
        language: group.language,
        src_dirs,
        header_dirs,
        include,
        exclude,
        target_args: config
            .toolchain
            .target_args
            .get(&group.target)
            .cloned()
            .unwrap_or_default(),
        compiler_args: group.compiler_args.clone(),
        linker_args: group.linker_args.clone(),
        skip_link: group.skip_link,
        change_detection: config.toolchain.change_detection,
        jobs: config.toolchain.jobs,
        llvm_dir: config.toolchain.llvm_dir.as_deref().map(absolutize),
        obj_dir: target_dir.join(group_name),
        module_path: target_dir.join(format!("{group_name}.bc")),
    })
}

fn extensions(language: Option<SourceLanguage>) -> Vec<&'static str> {
    match language {
        Some(lang) => lang.extensions().to_vec(),
        None => [SourceLanguage::C, SourceLanguage::Cpp]
            .iter()
            .flat_map(|l| l.extensions().iter().copied())
            .collect(),
    }
}

/// Default source globs: every extension of the language (or of both
/// languages when none is forced).
pub fn default_includes(language: Option<SourceLanguage>) -> Vec<String> {
    extensions(language)
        .into_iter()
        .map(|ext| format!("**/*.{ext}"))
        .collect()
}

/// Default exclusion globs: test sources named `*Test.<ext>`.
pub fn default_excludes(language: Option<SourceLanguage>) -> Vec<String> {
    extensions(language)
        .into_iter()
        .map(|ext| format!("**/*Test.{ext}"))
        .collect()
}
