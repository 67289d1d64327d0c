//! Load command - acquire artifacts into the cache directory

use super::{load_with_spinner, open_cache};
use crate::cli::args::LoadArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::{self, UiContext};

/// Execute the load command
pub async fn execute(args: LoadArgs, config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let cache = open_cache(config).await?;

    let names = if !args.attrs.is_empty() {
        args.attrs
    } else if !config.cache.attrs.is_empty() {
        config.cache.attrs.clone()
    } else {
        cache.registry().all().map(str::to_string).collect()
    };

    let acquired = load_with_spinner(&ctx, &cache, &names).await?;
    for artifact in &acquired {
        ui::step_ok_detail(&ctx, &artifact.name, &artifact.detail);
    }

    ui::remark(
        &ctx,
        &format!(
            "{} artifact(s) in {}",
            acquired.len(),
            cache.acquirer().cache_dir().display()
        ),
    );
    Ok(())
}
