use std::{collections::BTreeSet, path::{Path, PathBuf}};

use polars::prelude::DataFrame;

use crate::{
    common::{check_overwrite, ensure_dir_exists, require_dir_exists, stage_csv, stage_json, stage_parquet, PendingWrite},
    config::PipelineConfig,
    error::Result,
    nbhd::{neighborhood_info, NeighborhoodData, NeighborhoodIndex},
    street::{
        attach_flow, build_catalog, flow_chart, reconcile, speed_chart, CatalogReport, CompKey, Dataset,
        DatasetSchema, FlowReport, IdentifierMapping, ReconcileOptions, ReconcileReport, StreetCatalog,
    },
};

pub const STREET_DATA_FILE: &str = "street_data.parquet";
pub const FLOW_CHART_FILE: &str = "flow_chart.parquet";
pub const SPEED_CHART_FILE: &str = "speed_chart.parquet";
pub const NBHD_DATA_FILE: &str = "nbhd_data.json";
pub const NBHD_INFO_FILE: &str = "nbhd_info.csv";

/// Every source dataset, loaded and validated.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub neighborhoods: NeighborhoodIndex,
    pub streets: Dataset,
    pub yearly: Vec<Dataset>,
}

impl Inputs {
    /// Load the neighborhood polygons only.
    pub fn load_neighborhoods(config: &PipelineConfig, raw_dir: &Path) -> Result<NeighborhoodIndex> {
        require_dir_exists(raw_dir)?;
        NeighborhoodIndex::from_shapefile(&config.neighborhoods_path(raw_dir), config.neighborhood_fields())
    }

    /// Load every configured dataset. Fails on the first unreadable file or missing column.
    pub fn load(config: &PipelineConfig, raw_dir: &Path) -> Result<Self> {
        config.validate()?;
        let neighborhoods = Self::load_neighborhoods(config, raw_dir)?;
        let streets = Dataset::from_shapefile(&config.streets_path(raw_dir), DatasetSchema::STREETS)?;
        let yearly = config.years.iter()
            .map(|&year| Dataset::from_shapefile(&config.flow_path(raw_dir, year), DatasetSchema::for_year(year)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { neighborhoods, streets, yearly })
    }
}

/// Per-stage counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub reconcile: ReconcileReport,
    pub catalog: CatalogReport,
    pub flows: Vec<FlowReport>,
}

/// The finished street catalog with the mapping it was built from.
#[derive(Debug, Clone)]
pub struct StreetTable {
    pub catalog: StreetCatalog,
    pub mapping: IdentifierMapping,
    pub synthetic_keys: BTreeSet<CompKey>,
    pub report: RunReport,
}

/// Reconcile identifiers, build the catalog and attach every year's flow values.
pub fn build_street_table(
    index: &NeighborhoodIndex,
    streets: &Dataset,
    yearly: Vec<Dataset>,
    options: &ReconcileOptions,
) -> Result<StreetTable> {
    let reserved = streets.real_keys()
        .chain(yearly.iter().flat_map(Dataset::real_keys))
        .collect::<Vec<_>>();
    let reconciliation = reconcile(yearly, reserved, options)?;

    let (mut catalog, catalog_report) = build_catalog(index, streets, &reconciliation.datasets)?;
    let flows = reconciliation.datasets.iter().rev()
        .map(|dataset| attach_flow(&mut catalog, dataset, &reconciliation.mapping))
        .collect();

    Ok(StreetTable {
        catalog,
        mapping: reconciliation.mapping,
        synthetic_keys: reconciliation.synthetic_keys,
        report: RunReport { reconcile: reconciliation.report, catalog: catalog_report, flows },
    })
}

/// Run the street stages over loaded inputs.
pub fn run(inputs: Inputs, options: &ReconcileOptions) -> Result<(NeighborhoodIndex, StreetTable)> {
    let Inputs { neighborhoods, streets, yearly } = inputs;
    let table = build_street_table(&neighborhoods, &streets, yearly, options)?;
    Ok((neighborhoods, table))
}

/// An output file and its content.
#[derive(Debug)]
pub enum Artifact {
    Parquet(&'static str, DataFrame),
    Csv(&'static str, DataFrame),
    Json(&'static str, NeighborhoodData),
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Parquet(name, _) | Self::Csv(name, _) | Self::Json(name, _) => *name,
        }
    }

    fn stage(&self, path: &Path, force: bool) -> Result<PendingWrite> {
        match self {
            Self::Parquet(_, df) => stage_parquet(path, df, force),
            Self::Csv(_, df) => stage_csv(path, df, force),
            Self::Json(_, data) => stage_json(path, data, force),
        }
    }
}

/// Street catalog and chart tables.
pub fn street_artifacts(table: &StreetTable, num_nbhds: usize) -> Result<Vec<Artifact>> {
    Ok(vec![
        Artifact::Parquet(STREET_DATA_FILE, table.catalog.to_dataframe()?),
        Artifact::Parquet(FLOW_CHART_FILE, flow_chart(&table.catalog, num_nbhds)?),
        Artifact::Parquet(SPEED_CHART_FILE, speed_chart(&table.catalog, num_nbhds)?),
    ])
}

/// Neighborhood structure and summary tables.
pub fn neighborhood_artifacts(index: &NeighborhoodIndex) -> Result<Vec<Artifact>> {
    Ok(vec![
        Artifact::Json(NBHD_DATA_FILE, NeighborhoodData::from_index(index)),
        Artifact::Csv(NBHD_INFO_FILE, neighborhood_info(index)?),
    ])
}

/// Write fully computed artifacts into `out_dir`.
///
/// Every target is checked for overwrite and every file is serialized to a temp file
/// before the first one is renamed into place.
pub fn write_artifacts(out_dir: &Path, artifacts: &[Artifact], force: bool) -> Result<Vec<PathBuf>> {
    let paths = artifacts.iter()
        .map(|artifact| out_dir.join(artifact.file_name()))
        .collect::<Vec<_>>();
    for path in &paths {
        check_overwrite(path, force)?;
    }
    ensure_dir_exists(out_dir)?;

    let staged = artifacts.iter().zip(&paths)
        .map(|(artifact, path)| artifact.stage(path, force))
        .collect::<Result<Vec<_>>>()?;
    for (pending, path) in staged.into_iter().zip(&paths) {
        pending.finish()?;
        tracing::info!(path = %path.display(), "wrote artifact");
    }
    Ok(paths)
}
