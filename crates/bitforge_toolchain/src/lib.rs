//! External tool invocation.
//!
//! The pipeline never spawns processes directly. It builds an [`Invocation`]
//! and hands it to a [`Toolchain`], which runs it and reports the captured
//! output. [`SystemToolchain`] runs real clang/llvm-link binaries. With the
//! `fake` feature, `FakeToolchain` emulates them in-process for tests.

#![warn(missing_docs)]

pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod invocation;
pub mod system;

pub use error::ToolError;
#[cfg(any(test, feature = "fake"))]
pub use fake::{CallKind, FakeToolchain, RecordedCall};
pub use invocation::{Invocation, ToolOutput};
pub use system::SystemToolchain;

/// Runs external compiler and linker processes.
///
/// Implementations must be shareable across worker threads: the pipeline
/// issues independent invocations concurrently.
pub trait Toolchain: Send + Sync {
    /// Runs a compiler invocation (dependency listing or real compile).
    fn run_compiler(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;

    /// Runs a linker invocation.
    fn run_linker(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn run_compiler(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        (**self).run_compiler(invocation)
    }

    fn run_linker(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        (**self).run_linker(invocation)
    }
}
