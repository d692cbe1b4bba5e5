//! Build stamps: the last-built signal of an output.
//!
//! A stamp is written next to an output (`<output>.stamp`) after the output
//! was produced successfully. It holds the hash of the exact command line and
//! the fingerprint of every input observed for that build. The output is
//! current only while a fresh observation of the same inputs matches.
//!
//! Stamps are binary files with a header containing magic bytes, format
//! version, and a checksum of the payload, so truncated or foreign files are
//! read as a miss.

use std::path::{Path, PathBuf};

use bitforge_common::{ChangeDetection, ContentHash, Fingerprint};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::fs::{remove_if_exists, write_atomic};

/// Magic bytes identifying a bitforge stamp.
const STAMP_MAGIC: [u8; 4] = *b"BFST";

/// Current stamp format version. Increment on breaking changes to
/// the header or payload format.
const STAMP_FORMAT_VERSION: u32 = 1;

/// File extension appended to an output path to locate its stamp.
pub const STAMP_EXT: &str = "stamp";

/// Header prepended to every stamp for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StampHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: ContentHash,
}

/// Recorded inputs of one successful build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStamp {
    /// Hash of the executable, arguments and target of the step.
    pub command: ContentHash,
    /// Every input path with the fingerprint observed for it.
    pub inputs: Vec<(PathBuf, Fingerprint)>,
}

impl BuildStamp {
    /// Observes `inputs` and records them together with `command`.
    ///
    /// Returns `None` if any input cannot be fingerprinted; such a build must
    /// not be stamped because the next run could not prove it current.
    pub fn capture(command: ContentHash, inputs: &[PathBuf], mode: ChangeDetection) -> Option<Self> {
        let inputs = inputs
            .iter()
            .map(|path| Fingerprint::of(path, mode).map(|fp| (path.clone(), fp)))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { command, inputs })
    }

    /// Returns `true` if `command` and a fresh observation of `inputs` equal
    /// what this stamp recorded.
    ///
    /// A different input list, a changed fingerprint, or an input that no
    /// longer exists all count as a mismatch.
    pub fn matches(&self, command: ContentHash, inputs: &[PathBuf], mode: ChangeDetection) -> bool {
        if self.command != command || self.inputs.len() != inputs.len() {
            return false;
        }
        self.inputs
            .iter()
            .zip(inputs)
            .all(|((recorded, fp), current)| {
                recorded == current && Fingerprint::of(current, mode).as_ref() == Some(fp)
            })
    }

    /// Path of the stamp belonging to `output`.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(STAMP_EXT);
        output.with_file_name(name)
    }

    /// Loads the stamp of `output`, validating its header.
    ///
    /// Returns `None` if the stamp doesn't exist, the header is invalid, the
    /// format version doesn't match, or the checksum doesn't verify.
    pub fn load(output: &Path) -> Option<Self> {
        let raw = std::fs::read(Self::path_for(output)).ok()?;

        // Need at least 4 bytes for the header length
        if raw.len() < 4 {
            return None;
        }

        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }

        let header: StampHeader =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?
                .0;

        if header.magic != STAMP_MAGIC || header.format_version != STAMP_FORMAT_VERSION {
            return None;
        }

        let payload = &raw[4 + header_len..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return None;
        }

        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .ok()
            .map(|(stamp, _)| stamp)
    }

    /// Writes this stamp for `output`, replacing any previous one atomically.
    pub fn save(&self, output: &Path) -> Result<(), CacheError> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| CacheError::Serialization {
                reason: e.to_string(),
            },
        )?;

        let header = StampHeader {
            magic: STAMP_MAGIC,
            format_version: STAMP_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output_bytes = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output_bytes.extend_from_slice(&header_len.to_le_bytes());
        output_bytes.extend_from_slice(&header_bytes);
        output_bytes.extend_from_slice(&payload);

        write_atomic(&Self::path_for(output), &output_bytes)
    }

    /// Deletes the stamp of `output`, if present.
    ///
    /// Called before an output is rebuilt so that a failed build leaves no
    /// stamp claiming the old inputs are current.
    pub fn invalidate(output: &Path) -> Result<bool, CacheError> {
        remove_if_exists(&Self::path_for(output))
    }
}
