//! Get command - print one entity of an artifact

use super::{load_with_spinner, open_cache};
use crate::cli::args::{GetArgs, OutputFormat};
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::UiContext;
use serde_json::Value;

/// Execute the get command
pub async fn execute(args: GetArgs, config: &Config) -> CacheResult<()> {
    let cache = open_cache(config).await?;
    cache.registry().lookup(&args.kind)?;

    // Plain progress lines would end up in piped output
    let ctx = UiContext::detect();
    if ctx.is_interactive() {
        load_with_spinner(&ctx, &cache, &[args.kind.clone()]).await?;
    } else {
        cache.load([&args.kind]).await?;
    }

    let entity = cache.get(&args.kind, &args.id).await?;
    println!("{}", render(&entity, args.format)?);
    Ok(())
}

fn render(entity: &Value, format: OutputFormat) -> CacheResult<String> {
    Ok(match (format, entity) {
        (OutputFormat::Plain, Value::String(s)) => s.clone(),
        (OutputFormat::Plain, other) => serde_json::to_string(other)?,
        (OutputFormat::Json, other) => serde_json::to_string_pretty(other)?,
    })
}
