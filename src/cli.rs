use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Traffic-flow data preparation CLI
#[derive(Parser, Debug)]
#[command(name = "trafficflow", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON pipeline config; built-in Seattle layout when omitted
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the street catalog and chart tables
    Streets(StageArgs),

    /// Export neighborhood structure and summary tables
    Neighborhoods(StageArgs),

    /// Run both stages, writing nothing unless both succeed
    Prepare(StageArgs),
}

#[derive(Args, Debug)]
pub struct StageArgs {
    /// Directory holding the raw shapefiles
    #[arg(value_hint = ValueHint::DirPath)]
    pub raw: PathBuf,

    /// Output location (directory)
    #[arg(value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    /// Overwrite existing output files
    #[arg(long)]
    pub force: bool,
}
