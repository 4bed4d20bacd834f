use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::config::PipelineConfig;
use crate::pipeline::StreetTable;

pub mod neighborhoods;
pub mod prepare;
pub mod streets;

/// Load the config named on the command line, or the defaults.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = PipelineConfig::load(cli.config.as_deref())
        .context("could not load pipeline config")?;
    tracing::debug!(?config, "using pipeline config");
    Ok(config)
}

/// One line of counts per street stage.
fn print_street_summary(table: &StreetTable) {
    let report = &table.report;
    println!(
        "reconcile: {} records, {} synthetic keys, {} unkeyed, {} key conflicts, {} overrides, {} invalid ids",
        report.reconcile.records,
        report.reconcile.synthetic_keys,
        report.reconcile.unkeyed,
        report.reconcile.key_conflicts,
        report.reconcile.overrides,
        report.reconcile.invalid_values,
    );
    println!(
        "catalog: {} segments from {} records, {} skipped geometries, {} invalid attributes",
        report.catalog.rows_added,
        report.catalog.records,
        report.catalog.geometry_skipped,
        report.catalog.invalid_values,
    );
    for flow in &report.flows {
        println!(
            "flow {}: {} values written, {} unmatched keys, {} invalid values",
            flow.year, flow.values_written, flow.unmatched_keys, flow.invalid_values,
        );
    }
}
