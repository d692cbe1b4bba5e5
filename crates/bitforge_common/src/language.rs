//! Source language tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The language a source file is compiled as.
///
/// Selects the compiler executable and the language-specific flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    /// C (`.c`).
    C,
    /// C++ and Objective-C++ (`.cpp`, `.cc`, `.cxx`, `.mm`).
    Cpp,
}

impl SourceLanguage {
    /// Detects the language from a file's extension.
    ///
    /// Returns `None` for extensions that are not compiled sources.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "c" => Some(SourceLanguage::C),
            "cpp" | "cc" | "cxx" | "mm" => Some(SourceLanguage::Cpp),
            _ => None,
        }
    }

    /// Source file extensions belonging to this language.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            SourceLanguage::C => &["c"],
            SourceLanguage::Cpp => &["cpp", "cc", "cxx", "mm"],
        }
    }

    /// The clang driver used for this language.
    pub fn compiler_executable(self) -> &'static str {
        match self {
            SourceLanguage::C => "clang",
            SourceLanguage::Cpp => "clang++",
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLanguage::C => f.write_str("c"),
            SourceLanguage::Cpp => f.write_str("cpp"),
        }
    }
}

/// Error returned when a language name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source language: '{input}'")]
pub struct ParseLanguageError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for SourceLanguage {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(SourceLanguage::C),
            "cpp" | "c++" | "cxx" => Ok(SourceLanguage::Cpp),
            _ => Err(ParseLanguageError {
                input: s.to_string(),
            }),
        }
    }
}
