//! List command - print the entity ids of an artifact

use super::{load_with_spinner, open_cache};
use crate::cli::args::ListArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::UiContext;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> CacheResult<()> {
    let cache = open_cache(config).await?;
    cache.registry().lookup(&args.kind)?;

    let ctx = UiContext::detect();
    if ctx.is_interactive() {
        load_with_spinner(&ctx, &cache, &[args.kind.clone()]).await?;
    } else {
        cache.load([&args.kind]).await?;
    }

    let entities = cache.list(&args.kind).await?;
    let limit = args.limit.unwrap_or(usize::MAX);
    for id in entities.ids().take(limit) {
        println!("{}", id);
    }
    Ok(())
}
