//! Error types for tool invocation.

/// Errors raised while running an external tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool ran but exited unsuccessfully. `diagnostics` is the tool's
    /// own error output, unmodified.
    #[error("{tool} failed ({}): {command}\n{diagnostics}", describe_status(*status))]
    ToolInvocationFailed {
        /// Executable name.
        tool: String,
        /// The full command line that was run.
        command: String,
        /// Exit code, or `None` if the process was killed by a signal.
        status: Option<i32>,
        /// Captured standard error (standard output if stderr was empty).
        diagnostics: String,
    },

    /// The tool could not be started at all.
    #[error("failed to run {executable}: {source}")]
    Spawn {
        /// Executable that was looked up.
        executable: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

fn describe_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
