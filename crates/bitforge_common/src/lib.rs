//! Shared foundational types used across the bitforge build pipeline.
//!
//! This crate provides content hashing, change-detection fingerprints, the
//! source language tag, and the [`SourceFile`] / [`HeaderSet`] pair that every
//! pipeline stage passes around.

#![warn(missing_docs)]

pub mod fingerprint;
pub mod hash;
pub mod language;
pub mod source;

pub use fingerprint::{ChangeDetection, Fingerprint};
pub use hash::ContentHash;
pub use language::SourceLanguage;
pub use source::{HeaderSet, SourceFile};
