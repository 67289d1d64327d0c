//! Generate command - rebuild the whole registry into a directory

use super::{load_with_spinner, open_acquirer};
use crate::acquire::AcquirePolicy;
use crate::cache::RrCache;
use crate::cli::args::GenerateArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::{self, UiContext};
use tracing::info;

/// Execute the generate command
pub async fn execute(args: GenerateArgs, config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let policy = AcquirePolicy {
        local: !args.force,
        remote: false,
        strict_rebuild: config.cache.strict_rebuild,
    };
    let acquirer = open_acquirer(config, args.outdir.clone(), policy).await?;
    let cache = RrCache::in_memory(acquirer);

    info!(
        "Generating {} artifact(s) into {}",
        cache.registry().len(),
        args.outdir.display()
    );

    ui::intro(&ctx, &format!("Generating into {}", args.outdir.display()));
    let names: Vec<String> = cache.registry().all().map(str::to_string).collect();
    let acquired = load_with_spinner(&ctx, &cache, &names).await?;
    for artifact in &acquired {
        ui::step_ok_detail(&ctx, &artifact.name, &artifact.detail);
    }

    ui::step_ok(&ctx, &format!("{} artifact(s) generated", acquired.len()));
    Ok(())
}
