//! Registry descriptor parsing
//!
//! The descriptor is a JSON object mapping each artifact name to its
//! record. Unknown fields are ignored; the required ones are checked
//! after deserialization so errors can name the offending entry.

use crate::error::{CacheError, CacheResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed descriptor, in file order
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Descriptor {
    pub entries: IndexMap<String, DescriptorEntry>,
}

/// One artifact record as written in the descriptor
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DescriptorEntry {
    /// Dependency section (required)
    pub deps: Option<DepsSection>,

    /// Remote file section (required)
    pub file: Option<FileSection>,

    /// Historical names of this artifact
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// `deps` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DepsSection {
    /// Artifacts whose values feed this artifact's rebuild
    #[serde(default)]
    pub attr_deps: Vec<String>,

    /// Raw source files consumed by the rebuild
    #[serde(default)]
    pub file_deps: Vec<String>,
}

/// `file` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileSection {
    /// Base URL of the pre-built copy
    pub url: Option<String>,

    /// File name, appended to `url` and used as the local file name
    pub name: Option<String>,

    /// Expected SHA-512 fingerprint
    pub fingerprint: Option<String>,
}

impl Descriptor {
    /// Parse a descriptor from a JSON file on disk
    pub async fn from_file(path: &Path) -> CacheResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            CacheError::io(format!("reading registry descriptor {}", path.display()), e)
        })?;
        Self::parse(&content)
    }

    /// Parse a descriptor from a JSON string (for the packaged descriptor)
    pub fn parse(content: &str) -> CacheResult<Self> {
        serde_json::from_str(content).map_err(|e| CacheError::RegistryInvalid {
            entry: "<descriptor>".to_string(),
            reason: e.to_string(),
        })
    }
}

impl DescriptorEntry {
    /// Get the `deps` section or fail naming the entry
    pub fn require_deps(&self, entry: &str) -> CacheResult<&DepsSection> {
        self.deps.as_ref().ok_or_else(|| missing(entry, "deps"))
    }

    /// Get `file.url`, `file.name` and `file.fingerprint` or fail naming the entry
    pub fn require_file(&self, entry: &str) -> CacheResult<(&str, &str, &str)> {
        let file = self.file.as_ref().ok_or_else(|| missing(entry, "file"))?;
        let url = file.url.as_deref().ok_or_else(|| missing(entry, "file.url"))?;
        let name = file
            .name
            .as_deref()
            .ok_or_else(|| missing(entry, "file.name"))?;
        let fingerprint = file
            .fingerprint
            .as_deref()
            .ok_or_else(|| missing(entry, "file.fingerprint"))?;
        Ok((url, name, fingerprint))
    }
}

fn missing(entry: &str, field: &str) -> CacheError {
    CacheError::RegistryInvalid {
        entry: entry.to_string(),
        reason: format!("missing required field '{}'", field),
    }
}
