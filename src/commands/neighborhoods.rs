use anyhow::Result;

use crate::cli::{Cli, StageArgs};
use crate::pipeline::{self, Inputs};

pub fn run(cli: &Cli, args: &StageArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    tracing::info!(raw = %args.raw.display(), out = %args.out.display(), "exporting neighborhoods");

    let index = Inputs::load_neighborhoods(&config, &args.raw)?;
    let artifacts = pipeline::neighborhood_artifacts(&index)?;
    pipeline::write_artifacts(&args.out, &artifacts, args.force)?;

    println!("Wrote {} neighborhoods -> {}", index.len(), args.out.display());
    Ok(())
}
