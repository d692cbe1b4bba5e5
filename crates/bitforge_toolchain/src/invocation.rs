//! Invocation descriptions and captured results.

use std::path::{Path, PathBuf};

use bitforge_common::ContentHash;

use crate::error::ToolError;

/// One external tool run: executable, ordered arguments, working directory,
/// and the target platform it is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Logical executable name (`clang`, `clang++`, `llvm-link`). The
    /// toolchain decides where it is found.
    pub executable: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Working directory, or the current directory when `None`.
    pub working_dir: Option<PathBuf>,
    /// Target platform identifier.
    pub target: String,
}

impl Invocation {
    /// Creates an invocation with no arguments.
    pub fn new(executable: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            target: target.into(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    /// The command line as a single display string.
    pub fn command_line(&self) -> String {
        let mut line = self.executable.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// Hash of everything that determines the tool's result besides its
    /// input files: target, executable, and arguments.
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::from_parts(
            [self.target.as_str(), self.executable.as_str()]
                .into_iter()
                .chain(self.args.iter().map(String::as_str)),
        )
    }
}

/// Captured result of a finished tool process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, or `None` if terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// A successful run with the given standard output.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code and standard error.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` if the process exited with code 0.
    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Converts a non-zero exit into [`ToolError::ToolInvocationFailed`].
    pub fn check(self, invocation: &Invocation) -> Result<Self, ToolError> {
        if self.is_success() {
            return Ok(self);
        }
        let diagnostics = if self.stderr.trim().is_empty() {
            self.stdout
        } else {
            self.stderr
        };
        Err(ToolError::ToolInvocationFailed {
            tool: invocation.executable.clone(),
            command: invocation.command_line(),
            status: self.status,
            diagnostics,
        })
    }
}
