//! Registry command - show the artifact table or export a descriptor

use super::{open_acquirer, open_registry};
use crate::acquire::{write_atomic, AcquirePolicy, Acquirer, LocalStatus};
use crate::cli::args::RegistryArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::fingerprint;
use crate::registry::Registry;
use crate::ui::{self, UiContext};
use console::style;
use std::collections::HashMap;
use std::path::Path;

/// Execute the registry command
pub async fn execute(args: RegistryArgs, config: &Config) -> CacheResult<()> {
    match args.export {
        Some(path) => {
            let acquirer =
                open_acquirer(config, config.cache_dir(), AcquirePolicy::default()).await?;
            export(&acquirer, &path).await
        }
        None => {
            print_table(&*open_registry(config).await?);
            Ok(())
        }
    }
}

fn print_table(registry: &Registry) {
    println!(
        "{:<26} {:<34} {}",
        style("NAME").bold(),
        style("FILE").bold(),
        style("DEPENDS ON").bold()
    );
    println!("{}", "-".repeat(86));

    for spec in registry.specs() {
        let deps = if spec.attr_deps.is_empty() {
            style("-".to_string()).dim()
        } else {
            style(spec.attr_deps.join(", "))
        };
        println!("{:<26} {:<34} {}", spec.name, spec.remote.file_name, deps);
    }

    println!();
    println!("{} artifact(s)", registry.len());
}

/// Write a descriptor whose fingerprints are those of the accepted files in the cache
async fn export(acquirer: &Acquirer, path: &Path) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let registry = acquirer.registry();
    let mut fingerprints = HashMap::new();

    for spec in registry.specs() {
        match acquirer.inspect(&spec.name).await? {
            LocalStatus::Valid | LocalStatus::Minted => {
                let digest = fingerprint::digest_file(&acquirer.artifact_path(spec)).await?;
                fingerprints.insert(spec.name.clone(), digest);
            }
            LocalStatus::Corrupt { .. } => ui::step_warn_hint(
                &ctx,
                &format!("{} is corrupt, fingerprint kept", spec.name),
                "Run: rr-cache load to replace it",
            ),
            LocalStatus::Missing => {
                ui::step_warn(&ctx, &format!("{} not in cache, fingerprint kept", spec.name))
            }
        }
    }

    let descriptor = registry.to_descriptor(&fingerprints);
    let mut content = serde_json::to_string_pretty(&descriptor)?;
    content.push('\n');
    write_atomic(path, content.as_bytes()).await?;

    ui::step_ok_detail(
        &ctx,
        &format!("{} fingerprint(s) exported", fingerprints.len()),
        &path.display().to_string(),
    );
    Ok(())
}
