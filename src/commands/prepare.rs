use anyhow::Result;

use crate::cli::{Cli, StageArgs};
use crate::pipeline::{self, Inputs};

pub fn run(cli: &Cli, args: &StageArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    tracing::info!(raw = %args.raw.display(), out = %args.out.display(), "preparing all tables");

    let inputs = Inputs::load(&config, &args.raw)?;
    let (index, table) = pipeline::run(inputs, &config.reconcile_options())?;

    let mut artifacts = pipeline::neighborhood_artifacts(&index)?;
    artifacts.extend(pipeline::street_artifacts(&table, index.len())?);
    pipeline::write_artifacts(&args.out, &artifacts, args.force)?;

    super::print_street_summary(&table);
    println!(
        "Wrote {} neighborhoods and {} street segments -> {}",
        index.len(),
        table.catalog.len(),
        args.out.display(),
    );
    Ok(())
}
