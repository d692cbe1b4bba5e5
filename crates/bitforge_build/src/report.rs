//! Build results.

use std::path::PathBuf;

use serde::Serialize;

/// Stages a group build passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Refreshing dependency records.
    ExtractDeps,
    /// Compiling stale units.
    CompileUnits,
    /// Linking the module.
    Link,
    /// Nothing left to do.
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::ExtractDeps => "extract-deps",
            Phase::CompileUnits => "compile-units",
            Phase::Link => "link",
            Phase::Done => "done",
        })
    }
}

/// What one group build did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Group name.
    pub group: String,
    /// Number of sources discovered.
    pub sources: usize,
    /// Phases in which at least one step ran, always ending in [`Phase::Done`].
    pub phases: Vec<Phase>,
    /// Units whose dependency records were refreshed.
    pub extracted: Vec<String>,
    /// Units that were compiled.
    pub compiled: Vec<String>,
    /// Units whose leftover outputs were removed.
    pub pruned: Vec<String>,
    /// Whether the module was linked.
    pub linked: bool,
    /// The module path, unless linking is skipped or there is nothing to link.
    pub module: Option<PathBuf>,
}

impl BuildReport {
    /// Returns `true` if no tool ran and nothing was removed.
    pub fn is_up_to_date(&self) -> bool {
        self.extracted.is_empty() && self.compiled.is_empty() && self.pruned.is_empty() && !self.linked
    }

    /// Number of tool invocations the build issued.
    pub fn invocations(&self) -> usize {
        self.extracted.len() + self.compiled.len() + usize::from(self.linked)
    }
}
