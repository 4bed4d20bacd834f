use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trafficflow::cli::{Cli, Commands};
use trafficflow::commands::{neighborhoods, prepare, streets};

/// Log to stderr at a level set by `-v`, unless RUST_LOG is given.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match &cli.command {
        Commands::Streets(args) => streets::run(&cli, args),
        Commands::Neighborhoods(args) => neighborhoods::run(&cli, args),
        Commands::Prepare(args) => prepare::run(&cli, args),
    }
}
