//! Artifact acquisition
//!
//! Obtains one artifact with verified integrity. Resolution chain (first
//! success wins):
//! 1. Local copy in the cache directory, checked against the registry
//!    fingerprint or a rebuild-minted one from the ledger
//! 2. Pre-built remote copy, checked against the registry fingerprint and
//!    persisted on success
//! 3. Rebuild from raw sources and already resolved dependencies
//!
//! Steps 1 and 2 fall through on any integrity or transfer problem; step 3
//! is the last resort and its failures are fatal for the artifact.

pub mod ledger;

pub use ledger::{FingerprintLedger, MintedFingerprint, LEDGER_FILE};

use crate::build::{BuildInputs, Builders};
use crate::codec;
use crate::error::{CacheError, CacheResult, Step};
use crate::fingerprint;
use crate::registry::{ArtifactSpec, Registry};
use crate::sources::RawSourceProvider;
use crate::transfer::Transfer;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Where an acquired value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOfTruth {
    Local,
    Remote,
    Rebuilt,
}

impl fmt::Display for SourceOfTruth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Rebuilt => "rebuilt",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a successful acquisition
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub name: String,
    pub value: Arc<Value>,

    /// Digest of the persisted file
    pub fingerprint: String,

    /// Whether the digest matched the registry's published fingerprint
    pub fingerprint_verified: bool,

    pub source: SourceOfTruth,
}

/// Which acquisition steps are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquirePolicy {
    /// Reuse local copies
    pub local: bool,

    /// Download pre-built copies
    pub remote: bool,

    /// Fail instead of minting a fingerprint when a rebuild differs
    pub strict_rebuild: bool,
}

impl Default for AcquirePolicy {
    fn default() -> Self {
        Self {
            local: true,
            remote: true,
            strict_rebuild: false,
        }
    }
}

/// Local copy state as reported by [`Acquirer::inspect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStatus {
    /// Matches the registry fingerprint
    Valid,
    /// Matches a rebuild-minted fingerprint
    Minted,
    /// Present but matches nothing accepted
    Corrupt { actual: String },
    Missing,
}

impl fmt::Display for LocalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Minted => write!(f, "minted"),
            Self::Corrupt { .. } => write!(f, "corrupt"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Why a step handed over to the next one
#[derive(Debug)]
enum Miss {
    Absent,
    Unpublished,
    Unreadable(std::io::Error),
    Mismatch(CacheError),
    Undecodable(CacheError),
    Unreachable(CacheError),
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "no copy"),
            Self::Unpublished => write!(f, "no published fingerprint"),
            Self::Unreadable(e) => write!(f, "unreadable: {}", e),
            Self::Mismatch(e) | Self::Undecodable(e) | Self::Unreachable(e) => write!(f, "{}", e),
        }
    }
}

enum Attempt {
    Verified(ResolvedArtifact),
    TryNext(Miss),
}

enum State {
    Checking,
    Fetching,
    Rebuilding,
    Done(ResolvedArtifact),
    Failed(CacheError),
}

/// Acquires artifacts into one cache directory
pub struct Acquirer {
    registry: Arc<Registry>,
    cache_dir: PathBuf,
    transfer: Arc<dyn Transfer>,
    sources: Arc<dyn RawSourceProvider>,
    builders: Arc<Builders>,
    policy: AcquirePolicy,
    ledger: OnceCell<Mutex<FingerprintLedger>>,
}

impl Acquirer {
    pub fn new(
        registry: Arc<Registry>,
        cache_dir: PathBuf,
        transfer: Arc<dyn Transfer>,
        sources: Arc<dyn RawSourceProvider>,
        builders: Arc<Builders>,
    ) -> Self {
        Self {
            registry,
            cache_dir,
            transfer,
            sources,
            builders,
            policy: AcquirePolicy::default(),
            ledger: OnceCell::new(),
        }
    }

    pub fn with_policy(mut self, policy: AcquirePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn policy(&self) -> AcquirePolicy {
        self.policy
    }

    /// Local file of an artifact
    pub fn artifact_path(&self, spec: &ArtifactSpec) -> PathBuf {
        self.cache_dir.join(&spec.remote.file_name)
    }

    /// Acquire `name`, whose attribute dependencies are in `resolved`
    pub async fn acquire(
        &self,
        name: &str,
        resolved: &HashMap<String, Arc<Value>>,
    ) -> CacheResult<ResolvedArtifact> {
        let spec = self.registry.lookup(name)?;
        let mut attempted = Vec::new();
        let mut state = State::Checking;

        loop {
            state = match state {
                State::Checking if !self.policy.local => State::Fetching,
                State::Checking => {
                    attempted.push(Step::Local);
                    match self.check_local(spec).await {
                        Ok(Attempt::Verified(artifact)) => State::Done(artifact),
                        Ok(Attempt::TryNext(miss)) => {
                            debug!("{}: local copy not usable ({})", spec.name, miss);
                            State::Fetching
                        }
                        Err(e) => State::Failed(e),
                    }
                }
                State::Fetching if !self.policy.remote => State::Rebuilding,
                State::Fetching => {
                    attempted.push(Step::Remote);
                    match self.fetch_remote(spec).await {
                        Ok(Attempt::Verified(artifact)) => State::Done(artifact),
                        Ok(Attempt::TryNext(Miss::Unpublished)) => {
                            debug!("{}: no published fingerprint, not downloading", spec.name);
                            State::Rebuilding
                        }
                        Ok(Attempt::TryNext(miss)) => {
                            warn!("{}: remote copy not usable ({})", spec.name, miss);
                            State::Rebuilding
                        }
                        Err(e) => State::Failed(e),
                    }
                }
                State::Rebuilding => {
                    attempted.push(Step::Rebuild);
                    match self.rebuild(spec, resolved).await {
                        Ok(artifact) => State::Done(artifact),
                        Err(e) => State::Failed(e),
                    }
                }
                State::Done(artifact) => {
                    info!("{}: acquired from {}", artifact.name, artifact.source);
                    return Ok(artifact);
                }
                State::Failed(cause) => {
                    return Err(CacheError::unresolvable(&spec.name, attempted, cause));
                }
            };
        }
    }

    /// Report the state of an artifact's local copy
    pub async fn inspect(&self, name: &str) -> CacheResult<LocalStatus> {
        let spec = self.registry.lookup(name)?;
        let path = self.artifact_path(spec);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LocalStatus::Missing),
            Err(e) => return Err(CacheError::io(format!("reading {}", path.display()), e)),
        };

        let actual = fingerprint::digest(&bytes);
        if !bytes.is_empty() && fingerprint::matches(&actual, &spec.fingerprint) {
            return Ok(LocalStatus::Valid);
        }
        let ledger = self.ledger().await?.lock().await;
        match ledger.accepted(spec) {
            Some(minted) if !bytes.is_empty() && fingerprint::matches(&actual, minted) => {
                Ok(LocalStatus::Minted)
            }
            _ => Ok(LocalStatus::Corrupt { actual }),
        }
    }

    async fn ledger(&self) -> CacheResult<&Mutex<FingerprintLedger>> {
        self.ledger
            .get_or_try_init(|| async {
                FingerprintLedger::load(&self.cache_dir).await.map(Mutex::new)
            })
            .await
    }

    async fn check_local(&self, spec: &ArtifactSpec) -> CacheResult<Attempt> {
        let path = self.artifact_path(spec);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => return Ok(Attempt::TryNext(Miss::Absent)),
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Attempt::TryNext(Miss::Absent))
            }
            Err(e) => return Ok(Attempt::TryNext(Miss::Unreadable(e))),
        };

        let actual = fingerprint::digest(&bytes);
        let published = fingerprint::matches(&actual, &spec.fingerprint);
        if !published {
            let ledger = self.ledger().await?.lock().await;
            let minted = ledger
                .accepted(spec)
                .is_some_and(|minted| fingerprint::matches(&actual, minted));
            if !minted {
                return Ok(Attempt::TryNext(Miss::Mismatch(CacheError::FingerprintMismatch {
                    name: spec.name.clone(),
                    expected: spec.fingerprint.clone(),
                    actual,
                })));
            }
        }

        let value = match codec::decode(&spec.remote.file_name, &bytes) {
            Ok(value) => value,
            Err(e) => return Ok(Attempt::TryNext(Miss::Undecodable(e))),
        };

        Ok(Attempt::Verified(ResolvedArtifact {
            name: spec.name.clone(),
            value: Arc::new(value),
            fingerprint: actual,
            fingerprint_verified: true,
            source: SourceOfTruth::Local,
        }))
    }

    async fn fetch_remote(&self, spec: &ArtifactSpec) -> CacheResult<Attempt> {
        // Nothing downloaded could verify
        if spec.fingerprint.trim().is_empty() {
            return Ok(Attempt::TryNext(Miss::Unpublished));
        }

        let url = spec.remote.full_url();
        let bytes = match self.transfer.download(&url).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_recoverable() => return Ok(Attempt::TryNext(Miss::Unreachable(e))),
            Err(e) => return Err(e),
        };

        let actual = fingerprint::digest(&bytes);
        if bytes.is_empty() || !fingerprint::matches(&actual, &spec.fingerprint) {
            return Ok(Attempt::TryNext(Miss::Mismatch(CacheError::FingerprintMismatch {
                name: spec.name.clone(),
                expected: spec.fingerprint.clone(),
                actual,
            })));
        }

        let value = match codec::decode(&spec.remote.file_name, &bytes) {
            Ok(value) => value,
            Err(e) => return Ok(Attempt::TryNext(Miss::Undecodable(e))),
        };

        write_atomic(&self.artifact_path(spec), &bytes).await?;
        self.ledger().await?.lock().await.forget(&spec.name).await?;

        Ok(Attempt::Verified(ResolvedArtifact {
            name: spec.name.clone(),
            value: Arc::new(value),
            fingerprint: actual,
            fingerprint_verified: true,
            source: SourceOfTruth::Remote,
        }))
    }

    async fn rebuild(
        &self,
        spec: &ArtifactSpec,
        resolved: &HashMap<String, Arc<Value>>,
    ) -> CacheResult<ResolvedArtifact> {
        let transform = self
            .builders
            .get(&spec.name)
            .ok_or_else(|| CacheError::NoBuildTransform(spec.name.clone()))?;

        let mut inputs = BuildInputs::new();
        for dep in &spec.attr_deps {
            let canonical = &self.registry.lookup(dep)?.name;
            let value = resolved
                .get(canonical)
                .ok_or_else(|| CacheError::NotLoaded(canonical.clone()))?;
            inputs.add_attr(canonical.clone(), Arc::clone(value));
        }
        for file in &spec.file_deps {
            let bytes = self.sources.fetch(file).await?;
            inputs.add_source(file.clone(), bytes);
        }

        info!(
            "{}: rebuilding from {} raw sources and {} attributes",
            spec.name,
            spec.file_deps.len(),
            spec.attr_deps.len()
        );
        let name = spec.name.clone();
        let value = tokio::task::spawn_blocking(move || transform.build(&inputs))
            .await
            .map_err(|e| CacheError::build(&name, e))??;

        let bytes = codec::encode(&spec.remote.file_name, &value)?;
        let minted = fingerprint::digest(&bytes);
        let published = fingerprint::matches(&minted, &spec.fingerprint);
        if !published && self.policy.strict_rebuild {
            return Err(CacheError::FingerprintMismatch {
                name: spec.name.clone(),
                expected: spec.fingerprint.clone(),
                actual: minted,
            });
        }

        let path = self.artifact_path(spec);
        write_atomic(&path, &bytes).await?;
        let written = tokio::fs::read(&path)
            .await
            .map_err(|e| CacheError::io(format!("reading back {}", path.display()), e))?;
        if !fingerprint::verify(&written, &minted) {
            return Err(CacheError::FingerprintMismatch {
                name: spec.name.clone(),
                expected: minted,
                actual: fingerprint::digest(&written),
            });
        }

        let mut ledger = self.ledger().await?.lock().await;
        if published {
            ledger.forget(&spec.name).await?;
        } else {
            info!("{}: recording rebuilt fingerprint", spec.name);
            ledger.record(spec, &minted).await?;
        }

        Ok(ResolvedArtifact {
            name: spec.name.clone(),
            value: Arc::new(value),
            fingerprint: minted,
            fingerprint_verified: published,
            source: SourceOfTruth::Rebuilt,
        })
    }
}

/// Write `bytes` to a sibling temporary file, then rename it over `path`
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(format!("creating {}", parent.display()), e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| CacheError::io(format!("writing {}", tmp.display()), e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CacheError::io(format!("renaming {} to {}", tmp.display(), path.display()), e))
}
