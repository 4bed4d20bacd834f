use std::{collections::BTreeSet, fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    nbhd::NeighborhoodFields,
    street::{DatasetSchema, ReconcileOptions},
};

/// Placeholder substituted with the year in [`PipelineConfig::flow_path_template`].
const YEAR_PLACEHOLDER: &str = "{year}";

/// Input layout and reconciliation settings. Paths are relative to the raw-data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Neighborhood polygons shapefile.
    pub neighborhoods: PathBuf,
    /// Canonical street geometry shapefile.
    pub streets: PathBuf,
    /// Yearly traffic-flow shapefile, with `{year}` standing for the year.
    pub flow_path_template: String,
    pub years: Vec<u16>,
    pub synthetic_key_base: i64,
    /// FlowSegIds whose key list is replaced, not kept, when an older year disagrees.
    pub key_list_overrides: Vec<i64>,
    pub neighborhood_id_field: String,
    pub neighborhood_name_field: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let reconcile = ReconcileOptions::default();
        Self {
            neighborhoods: PathBuf::from("zillow-neighborhoods/zillow-neighborhoods.shp"),
            streets: PathBuf::from("Seattle_Streets/Seattle_Streets.shp"),
            flow_path_template: "{year}_Traffic_Flow_Counts/{year}_Traffic_Flow_Counts.shp".into(),
            years: crate::street::FLOW_YEARS.collect(),
            synthetic_key_base: reconcile.synthetic_key_base,
            key_list_overrides: reconcile.key_list_overrides,
            neighborhood_id_field: "regionid".into(),
            neighborhood_name_field: "name".into(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config; omitted fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::data_load(path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Check that every configured year has a known schema and the template names the year.
    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(Error::Config("no traffic flow years configured".into()));
        }
        let mut seen = BTreeSet::new();
        for &year in &self.years {
            DatasetSchema::for_year(year)?;
            if !seen.insert(year) {
                return Err(Error::Config(format!("year {year} is listed twice")));
            }
        }
        if self.years.len() > 1 && !self.flow_path_template.contains(YEAR_PLACEHOLDER) {
            return Err(Error::Config(format!("flow_path_template must contain {YEAR_PLACEHOLDER}")));
        }
        if self.synthetic_key_base < 0 {
            return Err(Error::Config("synthetic_key_base must not be negative".into()));
        }
        Ok(())
    }

    pub fn flow_path(&self, raw_dir: &Path, year: u16) -> PathBuf {
        raw_dir.join(self.flow_path_template.replace(YEAR_PLACEHOLDER, &year.to_string()))
    }

    pub fn streets_path(&self, raw_dir: &Path) -> PathBuf { raw_dir.join(&self.streets) }

    pub fn neighborhoods_path(&self, raw_dir: &Path) -> PathBuf { raw_dir.join(&self.neighborhoods) }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            synthetic_key_base: self.synthetic_key_base,
            key_list_overrides: self.key_list_overrides.clone(),
        }
    }

    pub fn neighborhood_fields(&self) -> NeighborhoodFields<'_> {
        NeighborhoodFields { id: &self.neighborhood_id_field, name: &self.neighborhood_name_field }
    }
}
