//! Source files and the header sets discovered for them.

use std::path::{Path, PathBuf};

use crate::language::SourceLanguage;

/// A single compiled source file within a build group.
///
/// Identity is the absolute path. Sources are enumerated fresh on every build
/// and never change during one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    language: SourceLanguage,
}

impl SourceFile {
    /// Creates a source file entry. `path` should be absolute.
    ///
    /// The logical name is the file name without its extension; it names the
    /// object file and dependency record produced for this source.
    pub fn new(path: PathBuf, language: SourceLanguage) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            language,
        }
    }

    /// Absolute path to the source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical name (file stem).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Language tag used to select compiler and flags.
    pub fn language(&self) -> SourceLanguage {
        self.language
    }
}

/// Ordered header paths one source file depends on.
///
/// May be empty for a header-less source. Duplicates are preserved as the
/// compiler reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    headers: Vec<PathBuf>,
}

impl HeaderSet {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header path.
    pub fn push(&mut self, header: PathBuf) {
        self.headers.push(header);
    }

    /// Returns `true` if no headers were recorded.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Number of recorded header paths.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Iterates over the header paths in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.headers.iter()
    }

    /// Borrows the header paths as a slice.
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.headers
    }
}

impl From<Vec<PathBuf>> for HeaderSet {
    fn from(headers: Vec<PathBuf>) -> Self {
        Self { headers }
    }
}

impl FromIterator<PathBuf> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            headers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}
