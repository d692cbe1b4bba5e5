//! Toolchain backed by real processes.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;
use crate::invocation::{Invocation, ToolOutput};
use crate::Toolchain;

/// Runs clang and llvm-link as child processes.
///
/// When an LLVM installation directory is configured, tools are resolved as
/// `<llvm_dir>/bin/<tool>`; otherwise they are looked up on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct SystemToolchain {
    llvm_dir: Option<PathBuf>,
}

impl SystemToolchain {
    /// Creates a toolchain that resolves tools under `llvm_dir`, if given.
    pub fn new(llvm_dir: Option<PathBuf>) -> Self {
        Self { llvm_dir }
    }

    /// Resolves a logical tool name to the executable that will be spawned.
    pub fn resolve(&self, tool: &str) -> PathBuf {
        match &self.llvm_dir {
            Some(dir) => dir.join("bin").join(tool),
            None => PathBuf::from(tool),
        }
    }

    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let executable = self.resolve(&invocation.executable);
        let mut command = Command::new(&executable);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        tracing::debug!(command = %invocation.command_line(), "spawning");

        let output = command.output().map_err(|e| ToolError::Spawn {
            executable: display(&executable),
            source: e,
        })?;
        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Toolchain for SystemToolchain {
    fn run_compiler(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.run(invocation)
    }

    fn run_linker(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.run(invocation)
    }
}
