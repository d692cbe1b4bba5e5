//! Dependency extraction: `-M` runs that refresh each source's record.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bitforge_cache::{BuildStamp, RecordStore};
use bitforge_common::{Fingerprint, HeaderSet, SourceFile};
use bitforge_config::ResolvedGroup;
use bitforge_depfile::parse_dependencies;
use bitforge_toolchain::{Invocation, Toolchain};

use crate::error::BuildError;
use crate::flags::{compiler_flags, DEPENDENCIES_FLAG};

/// Runs the compiler in dependency mode and maintains dependency records.
///
/// A record is current while its stamp matches the dependency command and
/// the source plus every header it lists. Editing any of them, or deleting a
/// listed header, makes the record stale and the next run re-extracts it.
pub struct DependencyExtractor<'a> {
    group: &'a ResolvedGroup,
    toolchain: &'a dyn Toolchain,
    records: RecordStore,
}

impl<'a> DependencyExtractor<'a> {
    /// Creates an extractor storing records in the group's object directory.
    pub fn new(group: &'a ResolvedGroup, toolchain: &'a dyn Toolchain) -> Self {
        Self {
            group,
            toolchain,
            records: RecordStore::new(&group.obj_dir),
        }
    }

    /// The record store this extractor writes to.
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// The `-M` invocation for `source`.
    pub fn invocation(&self, source: &SourceFile) -> Invocation {
        Invocation::new(source.language().compiler_executable(), &self.group.target)
            .args(compiler_flags(self.group, source.language()))
            .arg(DEPENDENCIES_FLAG)
            .path_arg(source.path())
            .current_dir(&self.group.obj_dir)
    }

    /// Returns `true` if the stored record for `source` is still valid.
    pub fn is_current(&self, source: &SourceFile) -> bool {
        let record = self.records.record_path(source);
        let Some(headers) = self.records.load(source) else {
            return false;
        };
        let Some(stamp) = BuildStamp::load(&record) else {
            return false;
        };
        stamp.matches(
            self.invocation(source).fingerprint(),
            &inputs(source, &headers),
            self.group.change_detection,
        )
    }

    /// Runs the dependency listing for `source` and replaces its record.
    ///
    /// On any failure the previous record is left as it was. The record is
    /// stamped only if no input was modified while the tool ran; otherwise
    /// it is stored unstamped and the next run extracts again.
    pub fn extract(&self, source: &SourceFile) -> Result<HeaderSet, BuildError> {
        let record = self.records.record_path(source);
        BuildStamp::invalidate(&record)?;

        let mode = self.group.change_detection;
        let source_before = Fingerprint::of(source.path(), mode);
        let started = SystemTime::now();

        let invocation = self.invocation(source);
        let output = self.toolchain.run_compiler(&invocation)?.check(&invocation)?;
        let headers = parse_dependencies(&output.stdout, source.path())?;
        self.records.store(source, &headers)?;

        match BuildStamp::capture(invocation.fingerprint(), &inputs(source, &headers), mode) {
            Some(stamp) if settled(&stamp, source_before, started) => stamp.save(&record)?,
            Some(_) => {
                tracing::warn!(unit = source.name(), "inputs changed during extraction; record left unstamped");
            }
            None => {
                tracing::warn!(unit = source.name(), "an input vanished during extraction; record left unstamped");
            }
        }
        tracing::debug!(unit = source.name(), headers = headers.len(), "extracted dependencies");
        Ok(headers)
    }
}

/// `true` if the source still has the fingerprint observed before the tool
/// started and no header was modified after that point.
fn settled(stamp: &BuildStamp, source_before: Option<Fingerprint>, started: SystemTime) -> bool {
    let Some((_, source_after)) = stamp.inputs.first() else {
        return false;
    };
    source_before.as_ref() == Some(source_after)
        && stamp.inputs[1..]
            .iter()
            .all(|(header, _)| !modified_after(header, started))
}

fn modified_after(path: &Path, instant: SystemTime) -> bool {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_or(true, |modified| modified > instant)
}

/// Inputs whose change invalidates a unit: the source, then its headers.
pub(crate) fn inputs(source: &SourceFile, headers: &HeaderSet) -> Vec<PathBuf> {
    std::iter::once(source.path().to_path_buf())
        .chain(headers.iter().cloned())
        .collect()
}
