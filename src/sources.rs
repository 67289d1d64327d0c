//! Raw source files used by rebuilds
//!
//! Rebuilding an artifact reads raw MetaNetX / RetroRules tables. The
//! [`InputCache`] provider keeps them in the input-cache directory and
//! downloads missing ones from the URL listed in the sources descriptor:
//!
//! ```json
//! { "mnx_4.4": { "url": "https://…/", "files": { "chem_xref.tsv": "<sha512>|null" } } }
//! ```
//!
//! Groups named `mnx_*` other than the configured MetaNetX version are
//! ignored.

use crate::acquire::write_atomic;
use crate::error::{CacheError, CacheResult};
use crate::fingerprint;
use crate::transfer::Transfer;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

// Packaged sources descriptor embedded at compile time
const BUILTIN_SOURCES: &str = include_str!("../data/sources.json");

/// Supplier of raw source files
#[async_trait]
pub trait RawSourceProvider: Send + Sync {
    /// Return the bytes of a raw source file or `SourceUnavailable`
    async fn fetch(&self, file_name: &str) -> CacheResult<Vec<u8>>;
}

/// Sources descriptor: where each raw file can be downloaded from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SourceCatalog {
    groups: IndexMap<String, SourceGroup>,
}

/// One group of files sharing a base URL
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceGroup {
    /// Base URL; files without one must already be on disk
    #[serde(default)]
    pub url: Option<String>,

    /// File name to expected fingerprint (`null` when unknown)
    #[serde(default)]
    pub files: IndexMap<String, Option<String>>,
}

/// Catalog entry for a single raw file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub url: Option<String>,
    pub fingerprint: Option<String>,
}

impl SourceCatalog {
    /// Load the packaged sources descriptor
    pub fn builtin() -> CacheResult<Self> {
        Self::parse(BUILTIN_SOURCES)
    }

    /// Load from `path` if given, the packaged descriptor otherwise
    pub async fn load(path: Option<&Path>) -> CacheResult<Self> {
        match path {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    CacheError::io(format!("reading sources descriptor {}", path.display()), e)
                })?;
                Self::parse(&content)
            }
            None => Self::builtin(),
        }
    }

    /// Parse a sources descriptor from JSON
    pub fn parse(content: &str) -> CacheResult<Self> {
        serde_json::from_str(content).map_err(|e| CacheError::RegistryInvalid {
            entry: "<sources>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Keep only the MetaNetX group matching `version`
    pub fn for_mnx_version(mut self, version: &str) -> Self {
        let wanted = format!("mnx_{}", version);
        self.groups
            .retain(|name, _| !name.starts_with("mnx_") || *name == wanted);
        self
    }

    /// Find a raw file in the catalog
    pub fn locate(&self, file_name: &str) -> Option<SourceFile> {
        self.groups.values().find_map(|group| {
            group.files.get(file_name).map(|fingerprint| SourceFile {
                url: group.url.clone(),
                fingerprint: fingerprint.clone().filter(|f| !f.trim().is_empty()),
            })
        })
    }

    /// Group names, in descriptor order
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

/// On-disk raw source cache with download fallback
pub struct InputCache {
    dir: PathBuf,
    catalog: SourceCatalog,
    transfer: Arc<dyn Transfer>,
}

impl InputCache {
    pub fn new(dir: PathBuf, catalog: SourceCatalog, transfer: Arc<dyn Transfer>) -> Self {
        Self {
            dir,
            catalog,
            transfer,
        }
    }

    /// Directory holding the raw files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_local(&self, path: &Path, expected: Option<&str>) -> Option<Vec<u8>> {
        let bytes = tokio::fs::read(path).await.ok()?;
        match expected {
            Some(expected) if !fingerprint::verify(&bytes, expected) => {
                warn!(
                    "Raw source {} does not match its fingerprint, fetching again",
                    path.display()
                );
                None
            }
            _ => Some(bytes),
        }
    }
}

#[async_trait]
impl RawSourceProvider for InputCache {
    async fn fetch(&self, file_name: &str) -> CacheResult<Vec<u8>> {
        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
            return Err(CacheError::SourceUnavailable(file_name.to_string()));
        }

        let entry = self.catalog.locate(file_name);
        let expected = entry.as_ref().and_then(|e| e.fingerprint.as_deref());
        let path = self.dir.join(file_name);

        if let Some(bytes) = self.read_local(&path, expected).await {
            debug!("Raw source {} found in {}", file_name, self.dir.display());
            return Ok(bytes);
        }

        let Some(base) = entry.as_ref().and_then(|e| e.url.as_deref()) else {
            return Err(CacheError::SourceUnavailable(file_name.to_string()));
        };

        let url = format!("{}{}", base, file_name);
        let bytes = match self.transfer.download(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{}", e);
                return Err(CacheError::SourceUnavailable(file_name.to_string()));
            }
        };

        if let Some(expected) = expected {
            if !fingerprint::verify(&bytes, expected) {
                warn!(
                    "Downloaded {} does not match its fingerprint; either the URL is broken or the file content has changed",
                    url
                );
                return Err(CacheError::SourceUnavailable(file_name.to_string()));
            }
        }

        write_atomic(&path, &bytes).await?;
        debug!("Raw source {} stored in {}", file_name, self.dir.display());
        Ok(bytes)
    }
}
