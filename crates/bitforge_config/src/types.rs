//! Configuration types deserialized from `bitforge.toml`.

use bitforge_common::{ChangeDetection, SourceLanguage};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `bitforge.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Toolchain location and build-wide behavior.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Named build groups, each producing one linked module.
    #[serde(default)]
    pub groups: BTreeMap<String, GroupConfig>,
}

/// Core project metadata required in every `bitforge.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Output directory, relative to the project root unless absolute.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
}

fn default_build_dir() -> String {
    "build".to_string()
}

/// Toolchain settings shared by every group.
#[derive(Debug, Default, Deserialize)]
pub struct ToolchainConfig {
    /// LLVM installation root; tools are taken from its `bin/` directory.
    /// When absent, tools are looked up on `PATH`.
    pub llvm_dir: Option<String>,
    /// Maximum number of concurrent tool invocations. Defaults to the
    /// number of available cores.
    pub jobs: Option<usize>,
    /// Signal used to decide whether an input file changed.
    #[serde(default)]
    pub change_detection: ChangeDetection,
    /// Extra compiler flags per target platform identifier.
    #[serde(default)]
    pub target_args: BTreeMap<String, Vec<String>>,
}

/// One build group: a set of sources compiled with the same flags and
/// linked into one module.
#[derive(Debug, Deserialize)]
pub struct GroupConfig {
    /// Target platform identifier (e.g. `linux_x64`, `mingw_x64`).
    pub target: String,
    /// Output group directory under `bitcode/`.
    #[serde(default = "default_output_group")]
    pub output_group: String,
    /// Forces every source to be compiled as this language. When absent the
    /// language is detected from each file's extension.
    pub language: Option<SourceLanguage>,
    /// Directories scanned for sources. Defaults to `src/<group>/cpp`.
    pub src_dirs: Option<Vec<String>>,
    /// Header search directories. Defaults to `src/<group>/headers`.
    pub header_dirs: Option<Vec<String>>,
    /// Glob patterns selecting sources. Defaults depend on the language.
    pub include: Option<Vec<String>>,
    /// Glob patterns removing sources even if included. Defaults to the
    /// `*Test.<ext>` pattern for each source extension.
    pub exclude: Option<Vec<String>>,
    /// Extra compiler arguments appended after the standard flags.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub compiler_args: Vec<String>,
    /// Extra linker arguments placed before the object list.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub linker_args: Vec<String>,
    /// Produce objects only; do not link a module.
    #[serde(default)]
    pub skip_link: bool,
}

fn default_output_group() -> String {
    "main".to_string()
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `compiler_args = "-DNDEBUG"` (string) and
/// `compiler_args = ["-DNDEBUG", "-g"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
