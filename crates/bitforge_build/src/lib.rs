//! Incremental compile-and-link pipeline for one build group.
//!
//! The [`Orchestrator`] discovers the group's sources and drives three stages
//! through a [`BuildGraph`]:
//!
//! 1. [`DependencyExtractor`] runs the compiler in `-M` mode and stores the
//!    header set of each source as a dependency record;
//! 2. [`UnitCompiler`] compiles each source whose source file or recorded
//!    headers changed since its object was last built;
//! 3. [`ModuleLinker`] links every object into the group's module.
//!
//! Each step runs only when its outputs are stale, and the linked module is
//! always what a clean rebuild would have produced.

#![warn(missing_docs)]

pub mod compile;
pub mod discover;
pub mod error;
pub mod extract;
pub mod flags;
pub mod graph;
pub mod layout;
pub mod link;
pub mod orchestrator;
pub mod report;

pub use compile::UnitCompiler;
pub use discover::discover_sources;
pub use error::BuildError;
pub use extract::DependencyExtractor;
pub use graph::{BuildGraph, GraphRun, Task};
pub use link::ModuleLinker;
pub use orchestrator::Orchestrator;
pub use report::{BuildReport, Phase};
