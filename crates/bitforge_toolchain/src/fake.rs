//! In-process stand-in for clang and llvm-link.
//!
//! [`FakeToolchain`] understands the subset of the command line the pipeline
//! issues (`-I<dir>`, `-M`, `-o <file>`, trailing source path) and emulates it
//! on the real filesystem:
//!
//! - dependency mode follows `#include "..."` lines transitively, resolving
//!   each name against the including file's directory and then the `-I`
//!   directories, and prints a `clang -M` style Make rule;
//! - compile mode writes a deterministic object made of the source and header
//!   contents;
//! - link mode concatenates the listed objects.
//!
//! Every call is recorded so tests can assert exactly which steps ran.
//! Failures can be injected per unit; injected failures leave a partial
//! output behind, as a crashing tool might.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::ToolError;
use crate::invocation::{Invocation, ToolOutput};
use crate::Toolchain;

/// What a recorded call asked the toolchain to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `-M` dependency listing.
    Dependencies,
    /// Compile to an object.
    Compile,
    /// Link objects into a module.
    Link,
}

/// A call observed by [`FakeToolchain`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The kind of work requested.
    pub kind: CallKind,
    /// Logical unit name (source stem), or the module stem for links.
    pub unit: String,
    /// The invocation as received.
    pub invocation: Invocation,
}

/// Scripted toolchain for tests.
#[derive(Debug, Default)]
pub struct FakeToolchain {
    calls: Mutex<Vec<RecordedCall>>,
    failing_units: Mutex<HashSet<String>>,
    malformed_units: Mutex<HashSet<String>>,
    fail_link: AtomicBool,
}

struct CompilerArgs {
    include_dirs: Vec<PathBuf>,
    deps_only: bool,
    output: Option<PathBuf>,
    source: PathBuf,
}

impl FakeToolchain {
    /// Creates a toolchain with no injected failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes compiling the unit named `name` fail.
    pub fn fail_unit(&self, name: &str) {
        lock(&self.failing_units).insert(name.to_string());
    }

    /// Makes the dependency listing of unit `name` start with a wrong target.
    pub fn emit_malformed_dependencies(&self, name: &str) {
        lock(&self.malformed_units).insert(name.to_string());
    }

    /// Makes every link fail (or succeed again).
    pub fn set_fail_link(&self, fail: bool) {
        self.fail_link.store(fail, Ordering::SeqCst);
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        lock(&self.failing_units).clear();
        lock(&self.malformed_units).clear();
        self.set_fail_link(false);
    }

    /// All calls recorded so far, in completion order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Returns the recorded calls and forgets them.
    pub fn take_calls(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    /// Number of recorded calls of `kind`.
    pub fn count(&self, kind: CallKind) -> usize {
        lock(&self.calls).iter().filter(|c| c.kind == kind).count()
    }

    /// Sorted unit names that received a call of `kind`.
    pub fn units(&self, kind: CallKind) -> Vec<String> {
        let mut units: Vec<String> = lock(&self.calls)
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.unit.clone())
            .collect();
        units.sort();
        units
    }

    fn record(&self, kind: CallKind, unit: &str, invocation: &Invocation) {
        lock(&self.calls).push(RecordedCall {
            kind,
            unit: unit.to_string(),
            invocation: invocation.clone(),
        });
    }

    fn dependencies(&self, args: &CompilerArgs, unit: &str) -> ToolOutput {
        if lock(&self.malformed_units).contains(unit) {
            return ToolOutput::success("clang: warning: argument unused during compilation\n");
        }
        let headers = match collect_headers(&args.source, &args.include_dirs) {
            Ok(headers) => headers,
            Err(output) => return output,
        };
        let mut out = format!("{unit}.o: {}", escape(&args.source));
        for header in &headers {
            out.push_str(" \\\n  ");
            out.push_str(&escape(header));
        }
        out.push('\n');
        ToolOutput::success(out)
    }

    fn compile(&self, args: &CompilerArgs, unit: &str, working_dir: Option<&Path>) -> ToolOutput {
        let output = args.output.clone().unwrap_or_else(|| {
            working_dir
                .unwrap_or_else(|| Path::new("."))
                .join(format!("{unit}.bc"))
        });
        if lock(&self.failing_units).contains(unit) {
            let _ = std::fs::write(&output, b"partial");
            return ToolOutput::failure(
                1,
                format!("{}:1:1: error: injected failure\n", args.source.display()),
            );
        }
        let headers = match collect_headers(&args.source, &args.include_dirs) {
            Ok(headers) => headers,
            Err(output) => return output,
        };

        let mut object = format!("; bitcode {unit}\n").into_bytes();
        for input in std::iter::once(&args.source).chain(headers.iter()) {
            match std::fs::read(input) {
                Ok(bytes) => object.extend_from_slice(&bytes),
                Err(_) => return missing_file(input),
            }
        }
        match std::fs::write(&output, object) {
            Ok(()) => ToolOutput::success(""),
            Err(e) => ToolOutput::failure(1, format!("error: unable to open output file: {e}\n")),
        }
    }
}

impl Toolchain for FakeToolchain {
    fn run_compiler(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let args = parse_compiler_args(&invocation.args);
        let unit = stem(&args.source);
        if args.deps_only {
            let out = self.dependencies(&args, &unit);
            self.record(CallKind::Dependencies, &unit, invocation);
            Ok(out)
        } else {
            let out = self.compile(&args, &unit, invocation.working_dir.as_deref());
            self.record(CallKind::Compile, &unit, invocation);
            Ok(out)
        }
    }

    fn run_linker(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let mut output = None;
        let mut inputs = Vec::new();
        let mut iter = invocation.args.iter();
        while let Some(arg) = iter.next() {
            if arg == "-o" {
                output = iter.next().map(PathBuf::from);
            } else if arg.ends_with(".bc") {
                inputs.push(PathBuf::from(arg));
            }
        }
        let Some(output) = output else {
            return Ok(ToolOutput::failure(1, "llvm-link: error: no output file\n"));
        };
        self.record(CallKind::Link, &stem(&output), invocation);

        if self.fail_link.load(Ordering::SeqCst) {
            let _ = std::fs::write(&output, b"partial");
            return Ok(ToolOutput::failure(1, "llvm-link: error: injected failure\n"));
        }

        let mut module = b"; linked module\n".to_vec();
        for input in &inputs {
            match std::fs::read(input) {
                Ok(bytes) => module.extend_from_slice(&bytes),
                Err(_) => return Ok(missing_file(input)),
            }
        }
        Ok(match std::fs::write(&output, module) {
            Ok(()) => ToolOutput::success(""),
            Err(e) => ToolOutput::failure(1, format!("llvm-link: error: {e}\n")),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parse_compiler_args(args: &[String]) -> CompilerArgs {
    let mut include_dirs = Vec::new();
    let mut deps_only = false;
    let mut output = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(dir) = arg.strip_prefix("-I") {
            include_dirs.push(PathBuf::from(dir));
        } else if arg == "-M" {
            deps_only = true;
        } else if arg == "-o" {
            output = iter.next().map(PathBuf::from);
        }
    }
    CompilerArgs {
        include_dirs,
        deps_only,
        output,
        source: args.last().map(PathBuf::from).unwrap_or_default(),
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn escape(path: &Path) -> String {
    path.to_string_lossy().replace(' ', "\\ ")
}

fn missing_file(path: &Path) -> ToolOutput {
    ToolOutput::failure(
        1,
        format!("error: no such file or directory: '{}'\n", path.display()),
    )
}

/// Follows quoted includes depth-first, returning each header once in
/// discovery order.
fn collect_headers(source: &Path, include_dirs: &[PathBuf]) -> Result<Vec<PathBuf>, ToolOutput> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    visit(source, include_dirs, &mut seen, &mut headers)?;
    Ok(headers)
}

fn visit(
    file: &Path,
    include_dirs: &[PathBuf],
    seen: &mut HashSet<PathBuf>,
    headers: &mut Vec<PathBuf>,
) -> Result<(), ToolOutput> {
    let text = std::fs::read_to_string(file).map_err(|_| missing_file(file))?;
    for (line_no, line) in text.lines().enumerate() {
        let Some(name) = quoted_include(line) else {
            continue;
        };
        let resolved = resolve_include(name, file, include_dirs).ok_or_else(|| {
            ToolOutput::failure(
                1,
                format!(
                    "{}:{}:10: fatal error: '{name}' file not found\n",
                    file.display(),
                    line_no + 1
                ),
            )
        })?;
        if seen.insert(resolved.clone()) {
            headers.push(resolved.clone());
            visit(&resolved, include_dirs, seen, headers)?;
        }
    }
    Ok(())
}

fn quoted_include(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("include")?.trim_start();
    let rest = rest.strip_prefix('"')?;
    rest.split('"').next()
}

fn resolve_include(name: &str, including: &Path, include_dirs: &[PathBuf]) -> Option<PathBuf> {
    including
        .parent()
        .into_iter()
        .chain(include_dirs.iter().map(PathBuf::as_path))
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
