//! Unit compilation.

use std::path::{Path, PathBuf};

use bitforge_cache::fs::remove_if_exists;
use bitforge_cache::{BuildStamp, RecordStore};
use bitforge_common::{HeaderSet, SourceFile};
use bitforge_config::ResolvedGroup;
use bitforge_toolchain::{Invocation, Toolchain};

use crate::error::BuildError;
use crate::extract::inputs;
use crate::flags::compiler_flags;
use crate::layout::{object_path, scratch_path};

/// Compiles sources into `<obj_dir>/<name>.bc`.
///
/// The compiler writes to a scratch file that is renamed over the object
/// only on success, so a failed compile leaves the previous object intact.
/// Staleness is judged against the source and the headers in the unit's
/// dependency record; a unit without a record is always stale.
pub struct UnitCompiler<'a> {
    group: &'a ResolvedGroup,
    toolchain: &'a dyn Toolchain,
    records: RecordStore,
}

impl<'a> UnitCompiler<'a> {
    /// Creates a compiler writing into the group's object directory.
    pub fn new(group: &'a ResolvedGroup, toolchain: &'a dyn Toolchain) -> Self {
        Self {
            group,
            toolchain,
            records: RecordStore::new(&group.obj_dir),
        }
    }

    /// Path of the object produced for `source`.
    pub fn object_path(&self, source: &SourceFile) -> PathBuf {
        object_path(&self.group.obj_dir, source.name())
    }

    /// The compile invocation for `source`, writing to `output`.
    pub fn invocation(&self, source: &SourceFile, output: &Path) -> Invocation {
        Invocation::new(source.language().compiler_executable(), &self.group.target)
            .args(compiler_flags(self.group, source.language()))
            .arg("-o")
            .path_arg(output)
            .path_arg(source.path())
            .current_dir(&self.group.obj_dir)
    }

    fn scratch_invocation(&self, source: &SourceFile) -> (Invocation, PathBuf) {
        let scratch = scratch_path(&self.object_path(source));
        (self.invocation(source, &scratch), scratch)
    }

    /// Returns `true` if the object for `source` reflects the current source,
    /// headers, and flags.
    pub fn is_current(&self, source: &SourceFile) -> bool {
        let object = self.object_path(source);
        if !object.is_file() {
            return false;
        }
        let Some(headers) = self.records.load(source) else {
            return false;
        };
        let Some(stamp) = BuildStamp::load(&object) else {
            return false;
        };
        let (invocation, _) = self.scratch_invocation(source);
        stamp.matches(
            invocation.fingerprint(),
            &inputs(source, &headers),
            self.group.change_detection,
        )
    }

    /// Compiles `source`, replacing its object on success.
    pub fn compile(&self, source: &SourceFile) -> Result<PathBuf, BuildError> {
        let object = self.object_path(source);
        let (invocation, scratch) = self.scratch_invocation(source);
        let headers = self.records.load(source);

        // Inputs are fingerprinted before the compiler reads them.
        let stamp = headers.as_ref().and_then(|h| {
            BuildStamp::capture(
                invocation.fingerprint(),
                &inputs(source, h),
                self.group.change_detection,
            )
        });

        BuildStamp::invalidate(&object)?;
        remove_if_exists(&scratch)?;

        let result = self
            .toolchain
            .run_compiler(&invocation)
            .and_then(|output| output.check(&invocation));
        if let Err(e) = result {
            remove_if_exists(&scratch)?;
            return Err(e.into());
        }
        if !scratch.is_file() {
            return Err(BuildError::MissingOutput {
                tool: invocation.executable.clone(),
                path: scratch,
            });
        }
        std::fs::rename(&scratch, &object).map_err(|e| BuildError::io(&object, e))?;

        match stamp {
            Some(stamp) => stamp.save(&object)?,
            None => {
                tracing::warn!(unit = source.name(), "inputs unavailable; object left unstamped");
            }
        }
        tracing::debug!(
            unit = source.name(),
            headers = headers.as_ref().map_or(0, HeaderSet::len),
            "compiled"
        );
        Ok(object)
    }
}
