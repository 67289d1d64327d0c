//! rr-cache - Verified cache of RetroRules and MetaNetX derived tables
//!
//! Artifacts are declared in a registry, ordered by their dependencies and
//! acquired from a local copy, a fingerprint-verified download or a
//! rebuild from raw sources.

pub mod acquire;
pub mod build;
pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod registry;
pub mod resolve;
pub mod sources;
pub mod store;
pub mod transfer;
pub mod ui;

pub use acquire::{AcquirePolicy, Acquirer, LocalStatus, ResolvedArtifact, SourceOfTruth};
pub use cache::{Entities, LoadEvent, RrCache};
pub use error::{CacheError, CacheResult, Step};
pub use registry::{ArtifactSpec, Registry};
pub use resolve::ResolutionPlan;
