//! File names inside a group's object directory.
//!
//! ```text
//! <obj_dir>/<name>.bc          compiled unit
//! <obj_dir>/<name>.bc.stamp    its build stamp
//! <obj_dir>/<name>.dep         dependency record
//! <obj_dir>/<name>.dep.stamp   the record's build stamp
//! ```

use std::path::{Path, PathBuf};

use bitforge_cache::fs::temp_path_for;

/// Extension of compiled units and linked modules.
pub const OBJECT_EXT: &str = "bc";

/// Path of the compiled unit for logical name `name`.
pub fn object_path(obj_dir: &Path, name: &str) -> PathBuf {
    obj_dir.join(format!("{name}.{OBJECT_EXT}"))
}

/// Scratch path a tool writes to before its output is moved into place.
pub fn scratch_path(output: &Path) -> PathBuf {
    temp_path_for(output)
}

/// Returns `true` if `path` names a compiled unit (`*.bc`).
pub fn is_object(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == OBJECT_EXT)
}
