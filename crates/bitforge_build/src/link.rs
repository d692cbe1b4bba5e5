//! Module linking.

use std::path::{Path, PathBuf};

use bitforge_cache::fs::remove_if_exists;
use bitforge_cache::BuildStamp;
use bitforge_config::ResolvedGroup;
use bitforge_toolchain::{Invocation, Toolchain};

use crate::error::BuildError;
use crate::layout::{is_object, scratch_path};

/// Linker executable.
pub const LINKER: &str = "llvm-link";

/// Links every compiled unit of a group into one module.
///
/// The object list is taken from the object directory at link time, sorted
/// by path, so the module is independent of discovery or completion order.
pub struct ModuleLinker<'a> {
    group: &'a ResolvedGroup,
    toolchain: &'a dyn Toolchain,
}

impl<'a> ModuleLinker<'a> {
    /// Creates a linker for `group`.
    pub fn new(group: &'a ResolvedGroup, toolchain: &'a dyn Toolchain) -> Self {
        Self { group, toolchain }
    }

    /// Path of the linked module.
    pub fn module_path(&self) -> &Path {
        &self.group.module_path
    }

    /// Sorted `*.bc` files in the object directory.
    pub fn collect_objects(&self) -> Result<Vec<PathBuf>, BuildError> {
        let dir = &self.group.obj_dir;
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BuildError::io(dir, e)),
        };
        let mut objects = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BuildError::io(dir, e))?.path();
            if is_object(&path) && path.is_file() {
                objects.push(path);
            }
        }
        objects.sort();
        Ok(objects)
    }

    /// `llvm-link -o <output> <linker_args> <objects>`.
    pub fn invocation(&self, objects: &[PathBuf], output: &Path) -> Invocation {
        let mut invocation = Invocation::new(LINKER, &self.group.target)
            .arg("-o")
            .path_arg(output)
            .args(self.group.linker_args.iter().cloned());
        for object in objects {
            invocation = invocation.path_arg(object);
        }
        invocation
    }

    /// Returns `true` if the module was linked from exactly `objects` in
    /// their current state with the current arguments.
    pub fn is_current(&self, objects: &[PathBuf]) -> bool {
        let module = self.module_path();
        if !module.is_file() {
            return false;
        }
        let Some(stamp) = BuildStamp::load(module) else {
            return false;
        };
        stamp.matches(
            self.invocation(objects, &scratch_path(module)).fingerprint(),
            objects,
            self.group.change_detection,
        )
    }

    /// Links `objects` into the module.
    ///
    /// On failure no partial module is left behind; a previous module stays
    /// in place without a stamp, so the next run links again.
    pub fn link(&self, objects: &[PathBuf]) -> Result<PathBuf, BuildError> {
        let module = self.module_path().to_path_buf();
        let scratch = scratch_path(&module);
        let invocation = self.invocation(objects, &scratch);
        let stamp = BuildStamp::capture(invocation.fingerprint(), objects, self.group.change_detection);

        BuildStamp::invalidate(&module)?;
        remove_if_exists(&scratch)?;

        let result = self
            .toolchain
            .run_linker(&invocation)
            .and_then(|output| output.check(&invocation));
        if let Err(e) = result {
            remove_if_exists(&scratch)?;
            return Err(e.into());
        }
        if !scratch.is_file() {
            return Err(BuildError::MissingOutput {
                tool: LINKER.to_string(),
                path: scratch,
            });
        }
        std::fs::rename(&scratch, &module).map_err(|e| BuildError::io(&module, e))?;

        match stamp {
            Some(stamp) => stamp.save(&module)?,
            None => tracing::warn!(module = %module.display(), "objects changed during link; module left unstamped"),
        }
        tracing::debug!(module = %module.display(), objects = objects.len(), "linked");
        Ok(module)
    }
}
