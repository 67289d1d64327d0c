//! Rebuild-minted fingerprints
//!
//! A rebuild can produce bytes whose digest differs from the registry's
//! expected value. In permissive mode the new digest is recorded here so
//! that later runs accept the persisted file as a local hit. An entry is
//! only honoured while the registry still expects the fingerprint it
//! replaced; a registry update invalidates it.

use crate::error::{CacheError, CacheResult};
use crate::registry::ArtifactSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ledger file name inside the cache directory
pub const LEDGER_FILE: &str = "fingerprints.json";

/// Fingerprint minted by a rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintedFingerprint {
    /// Digest of the rebuilt file
    pub fingerprint: String,

    /// Registry fingerprint at the time of the rebuild
    pub replaces: String,

    /// When the rebuild happened
    pub minted_at: DateTime<Utc>,
}

impl MintedFingerprint {
    pub fn new(fingerprint: String, replaces: String) -> Self {
        Self {
            fingerprint,
            replaces,
            minted_at: Utc::now(),
        }
    }

    /// Whether the entry still applies to `spec`
    pub fn applies_to(&self, spec: &ArtifactSpec) -> bool {
        self.replaces == spec.fingerprint
    }
}

/// Minted fingerprints of one cache directory
#[derive(Debug, Default)]
pub struct FingerprintLedger {
    path: PathBuf,
    entries: BTreeMap<String, MintedFingerprint>,
}

impl FingerprintLedger {
    /// Read the ledger of `cache_dir`; a missing file is an empty ledger
    pub async fn load(cache_dir: &Path) -> CacheResult<Self> {
        let path = cache_dir.join(LEDGER_FILE);
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring unreadable fingerprint ledger {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(CacheError::io(
                    format!("reading fingerprint ledger {}", path.display()),
                    e,
                ))
            }
        };
        debug!("Fingerprint ledger {} has {} entries", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    /// Minted fingerprint accepted for `spec`, if any
    pub fn accepted(&self, spec: &ArtifactSpec) -> Option<&str> {
        self.entries
            .get(&spec.name)
            .filter(|entry| entry.applies_to(spec))
            .map(|entry| entry.fingerprint.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&MintedFingerprint> {
        self.entries.get(name)
    }

    /// Record a minted fingerprint and write the ledger
    pub async fn record(&mut self, spec: &ArtifactSpec, fingerprint: &str) -> CacheResult<()> {
        self.entries.insert(
            spec.name.clone(),
            MintedFingerprint::new(fingerprint.to_string(), spec.fingerprint.clone()),
        );
        self.save().await
    }

    /// Drop the entry of `name` if present and write the ledger
    pub async fn forget(&mut self, name: &str) -> CacheResult<()> {
        if self.entries.remove(name).is_some() {
            self.save().await?;
        }
        Ok(())
    }

    async fn save(&self) -> CacheResult<()> {
        let content = serde_json::to_vec_pretty(&self.entries)?;
        super::write_atomic(&self.path, &content).await?;
        debug!("Fingerprint ledger written to {}", self.path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_ledger_is_empty() {
        let temp = TempDir::new().unwrap();
        let ledger = FingerprintLedger::load(temp.path()).await.unwrap();
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn recorded_fingerprint_survives_reload() {
        let temp = TempDir::new().unwrap();
        let registry = Registry::builtin().unwrap();
        let spec = registry.lookup("cid_xref").unwrap();

        let mut ledger = FingerprintLedger::load(temp.path()).await.unwrap();
        ledger.record(spec, "abc123").await.unwrap();

        let reloaded = FingerprintLedger::load(temp.path()).await.unwrap();
        assert_eq!(reloaded.accepted(spec), Some("abc123"));
        assert_eq!(reloaded.get("cid_xref").unwrap().replaces, spec.fingerprint);
    }

    #[tokio::test]
    async fn entry_is_ignored_after_registry_update() {
        let temp = TempDir::new().unwrap();
        let registry = Registry::builtin().unwrap();
        let mut spec = registry.lookup("cid_xref").unwrap().clone();

        let mut ledger = FingerprintLedger::load(temp.path()).await.unwrap();
        ledger.record(&spec, "abc123").await.unwrap();

        spec.fingerprint = "published".to_string();
        assert_eq!(ledger.accepted(&spec), None);
    }

    #[tokio::test]
    async fn corrupt_ledger_is_ignored() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(LEDGER_FILE), "{oops").unwrap();
        let ledger = FingerprintLedger::load(temp.path()).await.unwrap();
        assert!(ledger.is_empty());
    }
}
