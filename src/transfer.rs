//! Download client abstraction
//!
//! The acquirer and the input cache only need `download(url) -> bytes`.
//! [`HttpTransfer`] implements it with a blocking `ureq` agent moved onto
//! the tokio blocking pool; it owns the timeout and size limit.

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Abstract transfer client
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Fetch the full body at `url`.
    ///
    /// Any network error or non-success status is a `TransferFailed`.
    async fn download(&self, url: &str) -> CacheResult<Vec<u8>>;
}

/// HTTP(S) transfer client
#[derive(Clone)]
pub struct HttpTransfer {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpTransfer {
    /// Create a client with a global timeout and a body size limit
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, max_bytes }
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn download(&self, url: &str) -> CacheResult<Vec<u8>> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CacheError::transfer(url, "unsupported URL scheme"));
        }

        debug!("Downloading {}", url);
        let agent = self.agent.clone();
        let max_bytes = self.max_bytes;
        let target = url.to_string();

        let result = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ureq::Error> {
            let mut response = agent.get(&target).call()?;
            response
                .body_mut()
                .with_config()
                .limit(max_bytes)
                .read_to_vec()
        })
        .await
        .map_err(|e| CacheError::transfer(url, e))?;

        let bytes = result.map_err(|e| CacheError::transfer(url, e))?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}

/// Transfer client that never reaches the network.
///
/// Used when remote fetching is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl Transfer for Offline {
    async fn download(&self, url: &str) -> CacheResult<Vec<u8>> {
        Err(CacheError::transfer(url, "offline"))
    }
}
