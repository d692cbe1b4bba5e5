//! Parsing of compiler dependency listings.
//!
//! `clang -M` prints the headers a translation unit includes as a single Make
//! rule (`stem.o: dep dep \`), using backslash escapes for spaces and
//! backslash-newline continuations. This crate turns that text back into the
//! ordered [`HeaderSet`](bitforge_common::HeaderSet) for one source file.

#![warn(missing_docs)]

pub mod error;
pub mod parser;

pub use error::DepfileError;
pub use parser::{parse_dependencies, MakeRuleScanner};
