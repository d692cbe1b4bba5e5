//! Compiler flag assembly.
//!
//! Every invocation for a unit shares the same flag list:
//! target arguments, then the common and per-language flags, then the
//! group's own `compiler_args`. Dependency listing appends `-M`; compiling
//! appends `-o <object>`. The source path always comes last.

use bitforge_common::SourceLanguage;
use bitforge_config::ResolvedGroup;

/// Flag that makes the compiler print a Make rule instead of compiling.
pub const DEPENDENCIES_FLAG: &str = "-M";

const C_FLAGS: &[&str] = &["-std=gnu11", "-O3", "-Wall", "-Wextra", "-Werror"];

const CPP_FLAGS: &[&str] = &[
    "-std=c++14",
    "-Werror",
    "-O2",
    "-Wall",
    "-Wextra",
    "-Wno-unused-parameter",
    "-Wno-unused-function",
];

/// Returns `true` for MinGW targets, which reject `-fPIC`.
pub fn is_mingw(target: &str) -> bool {
    target.starts_with("mingw")
}

/// Flags specific to `language` on `target`.
pub fn language_flags(language: SourceLanguage, target: &str) -> Vec<String> {
    let base = match language {
        SourceLanguage::C => C_FLAGS,
        SourceLanguage::Cpp => CPP_FLAGS,
    };
    let mut flags: Vec<String> = base.iter().map(|f| f.to_string()).collect();
    if language == SourceLanguage::Cpp && !is_mingw(target) {
        flags.push("-fPIC".to_string());
    }
    flags
}

/// The full flag list for compiling a `language` source of `group`.
pub fn compiler_flags(group: &ResolvedGroup, language: SourceLanguage) -> Vec<String> {
    let mut flags = group.target_args.clone();
    flags.push("-c".to_string());
    flags.push("-emit-llvm".to_string());
    flags.extend(
        group
            .header_dirs
            .iter()
            .map(|dir| format!("-I{}", dir.display())),
    );
    flags.extend(language_flags(language, &group.target));
    flags.extend(group.compiler_args.iter().cloned());
    flags
}
