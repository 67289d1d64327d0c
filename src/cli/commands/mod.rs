//! CLI command implementations
//!
//! Every command that touches artifacts builds the same engine from the
//! loaded configuration: registry, raw-source input cache, HTTP transfer,
//! default build transforms and an acquirer over the configured cache
//! directory.

pub mod config;
pub mod generate;
pub mod get;
pub mod list;
pub mod load;
pub mod plan;
pub mod registry;
pub mod verify;

pub use config::execute as config;
pub use generate::execute as generate;
pub use get::execute as get;
pub use list::execute as list;
pub use load::execute as load;
pub use plan::execute as plan;
pub use registry::execute as registry;
pub use verify::execute as verify;

use crate::acquire::{AcquirePolicy, Acquirer};
use crate::build::{metanetx, Builders};
use crate::cache::{LoadEvent, RrCache};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::registry::Registry;
use crate::sources::{InputCache, SourceCatalog};
use crate::transfer::{HttpTransfer, Transfer};
use crate::ui::{TaskSpinner, UiContext};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Load the registry named in the configuration
pub(crate) async fn open_registry(config: &Config) -> CacheResult<Arc<Registry>> {
    let registry = Registry::load(config.registry.descriptor.as_deref()).await?;
    Ok(Arc::new(registry))
}

/// Build an acquirer writing to `cache_dir`
pub(crate) async fn open_acquirer(
    config: &Config,
    cache_dir: PathBuf,
    policy: AcquirePolicy,
) -> CacheResult<Acquirer> {
    let registry = open_registry(config).await?;
    let catalog = SourceCatalog::load(config.registry.sources.as_deref())
        .await?
        .for_mnx_version(&config.cache.mnx_version);

    let transfer: Arc<dyn Transfer> = Arc::new(HttpTransfer::new(
        Duration::from_secs(config.network.timeout_secs),
        config.max_download_bytes(),
    ));
    let inputs = InputCache::new(config.input_dir(), catalog, Arc::clone(&transfer));

    debug!(
        "Cache dir {}, input dir {}",
        cache_dir.display(),
        inputs.dir().display()
    );

    Ok(Acquirer::new(
        registry,
        cache_dir,
        transfer,
        Arc::new(inputs),
        Arc::new(open_builders(config).await?),
    )
    .with_policy(policy))
}

/// Default transforms plus the configured compound id conversions
async fn open_builders(config: &Config) -> CacheResult<Builders> {
    let builders = Builders::default_set();
    let Some(path) = config.registry.cid_conversions.as_deref() else {
        return Ok(builders);
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CacheError::io(format!("reading {}", path.display()), e))?;
    let conversions = metanetx::parse_conversions(&path.display().to_string(), &content)?;
    debug!("{} compound id conversions from {}", conversions.len(), path.display());
    Ok(builders.with_cid_conversions(conversions))
}

/// Cache over the configured directory with the default policy
pub(crate) async fn open_cache(config: &Config) -> CacheResult<RrCache> {
    let policy = AcquirePolicy {
        strict_rebuild: config.cache.strict_rebuild,
        ..AcquirePolicy::default()
    };
    let acquirer = open_acquirer(config, config.cache_dir(), policy).await?;
    Ok(RrCache::in_memory(acquirer))
}

/// Load `names` behind a spinner, returning what was acquired
pub(crate) async fn load_with_spinner(
    ctx: &UiContext,
    cache: &RrCache,
    names: &[String],
) -> CacheResult<Vec<Acquired>> {
    let mut spinner = TaskSpinner::new(ctx);
    let mut acquired = Vec::new();

    let result = cache
        .load_with_progress(names, |event| match event {
            LoadEvent::Planned(plan) => {
                spinner.start(&format!("Loading {} artifact(s)...", plan.len()))
            }
            LoadEvent::Started(name) => spinner.message(&format!("Acquiring {}...", name)),
            LoadEvent::Acquired(artifact) => acquired.push(Acquired {
                name: artifact.name.clone(),
                detail: format!(
                    "{}, {}",
                    artifact.source,
                    if artifact.fingerprint_verified {
                        "verified"
                    } else {
                        "minted"
                    }
                ),
            }),
            LoadEvent::Skipped(_) => {}
        })
        .await;

    match result {
        Ok(_) => {
            spinner.clear();
            Ok(acquired)
        }
        Err(e) => {
            spinner.stop_error("Load failed");
            Err(e)
        }
    }
}

/// One acquired artifact, ready for display
pub(crate) struct Acquired {
    pub name: String,
    pub detail: String,
}
