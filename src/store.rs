//! Artifact value storage
//!
//! The facade keeps every loaded artifact value in a [`Store`]. Values are
//! shared as `Arc<Value>` so accessors and rebuilds can hold them without
//! copying large maps.

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keyed storage of loaded artifact values
#[async_trait]
pub trait Store: Send + Sync {
    /// Whether a value is stored under `name`
    async fn has(&self, name: &str) -> bool;

    /// Stored value, or `NotLoaded`
    async fn get(&self, name: &str) -> CacheResult<Arc<Value>>;

    /// Store or replace a value
    async fn set(&self, name: &str, value: Arc<Value>);

    /// Names of all stored values
    async fn names(&self) -> Vec<String>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Arc<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn has(&self, name: &str) -> bool {
        self.values.read().await.contains_key(name)
    }

    async fn get(&self, name: &str) -> CacheResult<Arc<Value>> {
        self.values
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::NotLoaded(name.to_string()))
    }

    async fn set(&self, name: &str, value: Arc<Value>) {
        self.values.write().await.insert(name.to_string(), value);
    }

    async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
