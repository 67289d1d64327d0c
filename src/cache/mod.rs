//! Cache facade
//!
//! Ties the resolver, the acquirer and a value store together behind
//! `load`, `get` and `list`.
//!
//! # Load semantics
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | Empty request | Nothing planned, no I/O |
//! | Artifact already in the store | Skipped |
//! | Artifact acquired | Stored, visible to later artifacts of the plan |
//! | Fatal error at artifact X | Load stops at X, earlier artifacts stay stored |

pub mod entities;

pub use entities::{Entities, EntitiesIter};

use crate::acquire::{Acquirer, ResolvedArtifact};
use crate::error::{CacheError, CacheResult};
use crate::registry::Registry;
use crate::resolve::{self, ResolutionPlan};
use crate::store::{MemoryStore, Store};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Compound structures, keyed by MetaNetX compound id
pub const COMPOUNDS: &str = "cid_strc";

/// Template reactions, keyed by reaction id
pub const REACTIONS: &str = "template_reactions";

/// Reaction rules, keyed by rule id
pub const REACTION_RULES: &str = "rr_reactions";

/// Progress notifications emitted by [`RrCache::load_with_progress`]
#[derive(Debug)]
pub enum LoadEvent<'a> {
    /// The acquisition order was computed
    Planned(&'a ResolutionPlan),
    /// Artifact already in the store
    Skipped(&'a str),
    /// Acquisition of an artifact started
    Started(&'a str),
    /// Artifact acquired and stored
    Acquired(&'a ResolvedArtifact),
}

/// Artifact cache over a value store
pub struct RrCache<S: Store = MemoryStore> {
    acquirer: Acquirer,
    store: S,
}

impl RrCache<MemoryStore> {
    /// Cache backed by an in-process store
    pub fn in_memory(acquirer: Acquirer) -> Self {
        Self::new(acquirer, MemoryStore::new())
    }
}

impl<S: Store> RrCache<S> {
    pub fn new(acquirer: Acquirer, store: S) -> Self {
        Self { acquirer, store }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.acquirer.registry()
    }

    pub fn acquirer(&self) -> &Acquirer {
        &self.acquirer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the requested artifacts and their dependencies
    pub async fn load<I, N>(&self, names: I) -> CacheResult<ResolutionPlan>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        self.load_with_progress(names, |_| {}).await
    }

    /// Same as [`load`](Self::load), reporting each step to `observer`
    pub async fn load_with_progress<I, N, F>(
        &self,
        names: I,
        mut observer: F,
    ) -> CacheResult<ResolutionPlan>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
        F: FnMut(LoadEvent<'_>),
    {
        let registry = Arc::clone(self.registry());
        let plan = resolve::plan(&registry, names)?;
        observer(LoadEvent::Planned(&plan));

        for name in &plan {
            if self.store.has(name).await {
                debug!("{} already loaded", name);
                observer(LoadEvent::Skipped(name));
                continue;
            }
            observer(LoadEvent::Started(name));

            let spec = registry.lookup(name)?;
            let mut resolved = HashMap::with_capacity(spec.attr_deps.len());
            for dep in &spec.attr_deps {
                let canonical = &registry.lookup(dep)?.name;
                let value = self.store.get(canonical).await?;
                resolved.insert(canonical.clone(), value);
            }

            let artifact = self.acquirer.acquire(name, &resolved).await?;
            self.store.set(name, Arc::clone(&artifact.value)).await;
            observer(LoadEvent::Acquired(&artifact));
        }

        Ok(plan)
    }

    /// One entity of a loaded artifact
    pub async fn get(&self, kind: &str, id: &str) -> CacheResult<Value> {
        let value = self.store.get(self.canonical(kind)).await?;
        let entity = match value.as_ref() {
            Value::Object(map) => map.get(id),
            Value::Array(items) => id.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        entity.cloned().ok_or_else(|| CacheError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        })
    }

    /// All entities of a loaded artifact
    pub async fn list(&self, kind: &str) -> CacheResult<Entities> {
        let canonical = self.canonical(kind);
        let value = self.store.get(canonical).await?;
        Ok(Entities::new(canonical, value))
    }

    /// Names of the artifacts currently in the store
    pub async fn loaded(&self) -> Vec<String> {
        self.store.names().await
    }

    /// Compound structure by MetaNetX id
    pub async fn compound(&self, cid: &str) -> CacheResult<Value> {
        self.ensure_loaded(COMPOUNDS).await?;
        self.get(COMPOUNDS, cid).await
    }

    pub async fn compound_list(&self) -> CacheResult<Entities> {
        self.ensure_loaded(COMPOUNDS).await?;
        self.list(COMPOUNDS).await
    }

    /// Template reaction by reaction id
    pub async fn reaction(&self, rxn_id: &str) -> CacheResult<Value> {
        self.ensure_loaded(REACTIONS).await?;
        self.get(REACTIONS, rxn_id).await
    }

    pub async fn reaction_list(&self) -> CacheResult<Entities> {
        self.ensure_loaded(REACTIONS).await?;
        self.list(REACTIONS).await
    }

    /// Reaction rule by rule id
    pub async fn reaction_rule(&self, rule_id: &str) -> CacheResult<Value> {
        self.ensure_loaded(REACTION_RULES).await?;
        self.get(REACTION_RULES, rule_id).await
    }

    pub async fn reaction_rule_list(&self) -> CacheResult<Entities> {
        self.ensure_loaded(REACTION_RULES).await?;
        self.list(REACTION_RULES).await
    }

    async fn ensure_loaded(&self, name: &str) -> CacheResult<()> {
        if !self.store.has(name).await {
            self.load([name]).await?;
        }
        Ok(())
    }

    /// Registry name for `kind`, resolving aliases
    fn canonical<'a>(&'a self, kind: &'a str) -> &'a str {
        self.registry()
            .lookup(kind)
            .map(|spec| spec.name.as_str())
            .unwrap_or(kind)
    }
}
