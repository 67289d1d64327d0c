//! Plan command - print the acquisition order without acquiring anything

use super::open_registry;
use crate::cli::args::PlanArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::resolve;

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config) -> CacheResult<()> {
    let registry = open_registry(config).await?;
    let plan = resolve::plan(&registry, &args.attrs)?;

    for name in &plan {
        println!("{}", name);
    }
    Ok(())
}
