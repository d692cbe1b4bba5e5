//! Source discovery.
//!
//! Walks every source directory of a group and keeps the files whose path
//! relative to that directory matches an include glob and no exclude glob.
//! `*` does not cross directory separators; `**` does.

use std::collections::HashMap;
use std::path::Path;

use bitforge_common::{SourceFile, SourceLanguage};
use bitforge_config::ResolvedGroup;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::BuildError;

/// Compiles `patterns` into one matcher.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet, BuildError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| BuildError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| BuildError::InvalidPattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// Lists the sources of `group`, sorted by path.
///
/// Missing source directories contribute nothing. Fails with
/// [`BuildError::DuplicateUnitName`] if two sources share a logical name.
pub fn discover_sources(group: &ResolvedGroup) -> Result<Vec<SourceFile>, BuildError> {
    let include = build_globset(&group.include)?;
    let exclude = build_globset(&group.exclude)?;

    let mut sources = Vec::new();
    for dir in &group.src_dirs {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "source directory does not exist");
            continue;
        }
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                BuildError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(dir).unwrap_or(path);
            if !include.is_match(relative) || exclude.is_match(relative) {
                continue;
            }
            match language_of(path, group.language) {
                Some(language) => sources.push(SourceFile::new(path.to_path_buf(), language)),
                None => {
                    tracing::warn!(file = %path.display(), "skipping file with unknown language");
                }
            }
        }
    }

    sources.sort_by(|a, b| a.path().cmp(b.path()));
    sources.dedup_by(|a, b| a.path() == b.path());
    check_unique_names(&sources)?;
    Ok(sources)
}

fn language_of(path: &Path, forced: Option<SourceLanguage>) -> Option<SourceLanguage> {
    forced.or_else(|| SourceLanguage::from_path(path))
}

fn check_unique_names(sources: &[SourceFile]) -> Result<(), BuildError> {
    let mut seen: HashMap<&str, &SourceFile> = HashMap::new();
    for source in sources {
        if let Some(first) = seen.insert(source.name(), source) {
            return Err(BuildError::DuplicateUnitName {
                name: source.name().to_string(),
                first: first.path().to_path_buf(),
                second: source.path().to_path_buf(),
            });
        }
    }
    Ok(())
}
