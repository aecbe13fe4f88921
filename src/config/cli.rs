use crate::core::etl::StageSelection;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "listing-harvest")]
#[command(about = "Collects, enriches and merges business listings per area")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "harvest-config.toml")]
    pub config: String,

    #[arg(long, value_enum, default_value = "all")]
    pub stage: StageSelection,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Resolve areas and show checkpoint state without fetching listings
    #[arg(long)]
    pub dry_run: bool,
}
