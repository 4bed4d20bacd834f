use anyhow::Result;

use crate::cli::{Cli, StageArgs};
use crate::pipeline::{self, Inputs};

pub fn run(cli: &Cli, args: &StageArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    tracing::info!(raw = %args.raw.display(), out = %args.out.display(), "building street tables");

    let inputs = Inputs::load(&config, &args.raw)?;
    let (index, table) = pipeline::run(inputs, &config.reconcile_options())?;
    let artifacts = pipeline::street_artifacts(&table, index.len())?;
    pipeline::write_artifacts(&args.out, &artifacts, args.force)?;

    super::print_street_summary(&table);
    println!("Wrote {} street segments -> {}", table.catalog.len(), args.out.display());
    Ok(())
}
