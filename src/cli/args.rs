//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// rr-cache - Verified cache of RetroRules and MetaNetX tables
///
/// Loads derived artifacts from a local copy, a verified download or a
/// rebuild from raw sources, in dependency order.
#[derive(Parser, Debug)]
#[command(name = "rr-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RR_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache root directory (overrides cache.dir)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load artifacts and their dependencies
    Load(LoadArgs),

    /// Print the acquisition order of artifacts
    Plan(PlanArgs),

    /// Print one entity of an artifact
    Get(GetArgs),

    /// List the entity ids of an artifact
    List(ListArgs),

    /// Rebuild every artifact into a directory
    Generate(GenerateArgs),

    /// Report the state of local artifact copies
    Verify,

    /// Show the artifact registry
    Registry(RegistryArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the load command
#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Artifacts to load (default: cache.attrs, or all)
    pub attrs: Vec<String>,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Artifacts to plan for
    #[arg(required = true)]
    pub attrs: Vec<String>,
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Artifact holding the entity (e.g. cid_strc)
    pub kind: String,

    /// Entity id (array artifacts take an index)
    pub id: String,

    /// Output format
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Artifact to list
    pub kind: String,

    /// Print at most N ids
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the generate command
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Output directory
    pub outdir: PathBuf,

    /// Rebuild even when a valid copy already exists
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the registry command
#[derive(Parser, Debug)]
pub struct RegistryArgs {
    /// Write a descriptor with the fingerprints of the current cache files
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Entity output format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Strings bare, everything else compact JSON
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let argv = ["rr-cache", "load", "cid_strc", "-vv", "--cache-dir", "/tmp/x"];
        let cli = Cli::try_parse_from(argv).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::Load(args) => assert_eq!(args.attrs, vec!["cid_strc"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn plan_requires_attrs() {
        assert!(Cli::try_parse_from(["rr-cache", "plan"]).is_err());
    }

    #[test]
    fn get_format_plain() {
        let argv = ["rr-cache", "get", "cid_name", "MNXM1", "--format", "plain"];
        let cli = Cli::try_parse_from(argv).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Get(GetArgs { format: OutputFormat::Plain, .. })
        ));
    }
}
