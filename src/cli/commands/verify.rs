//! Verify command - report the state of each local artifact copy

use super::open_acquirer;
use crate::acquire::{AcquirePolicy, LocalStatus};
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::{self, UiContext};

/// Execute the verify command
pub async fn execute(config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let acquirer = open_acquirer(config, config.cache_dir(), AcquirePolicy::default()).await?;

    ui::intro(
        &ctx,
        &format!("Artifacts in {}", acquirer.cache_dir().display()),
    );

    let mut problems = 0;
    for spec in acquirer.registry().specs() {
        let status = acquirer.inspect(&spec.name).await?;
        let ok = matches!(status, LocalStatus::Valid | LocalStatus::Minted);
        if !ok {
            problems += 1;
        }
        ui::key_value_status(&ctx, &spec.name, &status.to_string(), ok);
        if let LocalStatus::Corrupt { actual } = &status {
            ui::remark(&ctx, &format!("    digest {}", short(actual)));
        }
    }

    println!();
    if problems == 0 {
        ui::step_ok(&ctx, "All artifacts present and verified");
    } else {
        ui::step_warn_hint(
            &ctx,
            &format!("{} artifact(s) missing or corrupt", problems),
            "Run: rr-cache load",
        );
    }
    Ok(())
}

fn short(digest: &str) -> &str {
    digest.get(..16).unwrap_or(digest)
}
