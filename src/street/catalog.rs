use std::collections::{BTreeMap, HashMap, HashSet};

use geo::{LineString, MultiLineString};
use polars::prelude::*;
use rayon::prelude::*;

use crate::{
    error::{Error, GeometryError, Result},
    geom::resolve_polyline,
    nbhd::{NeighborhoodIdx, NeighborhoodIndex},
};
use super::{
    keys::{CompKey, KeyList},
    reconcile::LinkedDataset,
    record::{Dataset, RawField},
    scheme::{self, DatasetKind},
};

/// Sentinel for unknown speed limits and flow values.
pub const UNKNOWN: i64 = -1;

/// Arterial classification of a street segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArterialClass {
    /// Not designated, or no usable classification.
    #[default]
    NotDesignated = 0,
    Principal = 1,
    Minor = 2,
    Collector = 3,
    StateHighway = 4,
    Interstate = 5,
}

impl ArterialClass {
    pub const ALL: [Self; 6] = [
        Self::NotDesignated, Self::Principal, Self::Minor, Self::Collector, Self::StateHighway, Self::Interstate,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.code() as i64 == code)
    }

    #[inline] pub fn code(self) -> i32 { self as i32 }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotDesignated => "Not Designated",
            Self::Principal => "Principal Arterial",
            Self::Minor => "Minor Arterial",
            Self::Collector => "Collector Arterial",
            Self::StateHighway => "State Highway",
            Self::Interstate => "Interstate Freeway",
        }
    }
}

/// One street segment of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub key: CompKey,
    pub name: String,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    /// Speed limit in mph, or [`UNKNOWN`].
    pub speed: i64,
    pub road: ArterialClass,
    pub nbhd: Vec<NeighborhoodIdx>,
}

/// Deduplicated street segments, one row per CompKey, with per-year flow columns.
#[derive(Debug, Clone, Default)]
pub struct StreetCatalog {
    rows: Vec<CatalogRow>,
    index: HashMap<CompKey, usize>,
    flows: BTreeMap<u16, Vec<i64>>,
}

impl StreetCatalog {
    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn rows(&self) -> &[CatalogRow] { &self.rows }

    /// Position of the row for `key`.
    #[inline] pub fn position(&self, key: CompKey) -> Option<usize> { self.index.get(&key).copied() }

    pub fn row(&self, key: CompKey) -> Option<&CatalogRow> {
        self.position(key).map(|pos| &self.rows[pos])
    }

    /// Years with an attached flow column, ascending.
    pub fn years(&self) -> impl Iterator<Item = u16> + '_ { self.flows.keys().copied() }

    pub fn flow_column(&self, year: u16) -> Option<&[i64]> { self.flows.get(&year).map(Vec::as_slice) }

    /// Flow value of `key` in `year`, [`UNKNOWN`] if absent for that segment.
    pub fn flow(&self, key: CompKey, year: u16) -> Option<i64> {
        Some(self.flow_column(year)?[self.position(key)?])
    }

    /// Replace (or add) the flow column for `year`. The column must cover every row.
    pub(crate) fn set_flow_column(&mut self, year: u16, column: Vec<i64>) -> Option<Vec<i64>> {
        assert_eq!(column.len(), self.rows.len(), "flow column length must match catalog rows");
        self.flows.insert(year, column)
    }

    /// Materialize the catalog as a table:
    /// `key, name, lon, lat, speed, road, nbhd` followed by one column per year.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![
            Column::new("key".into(), self.rows.iter().map(|row| row.key).collect::<Vec<_>>()),
            Column::new("name".into(), self.rows.iter().map(|row| row.name.as_str()).collect::<Vec<_>>()),
            list_column("lon", self.rows.iter().map(|row| row.lon.clone()), DataType::Float64),
            list_column("lat", self.rows.iter().map(|row| row.lat.clone()), DataType::Float64),
            Column::new("speed".into(), self.rows.iter().map(|row| row.speed).collect::<Vec<_>>()),
            Column::new("road".into(), self.rows.iter().map(|row| row.road.code()).collect::<Vec<_>>()),
            list_column("nbhd", self.rows.iter().map(|row| row.nbhd.clone()), DataType::UInt32),
        ];
        columns.extend(self.flows.iter()
            .map(|(year, values)| Column::new(year.to_string().into(), values.as_slice())));

        Ok(DataFrame::new(columns)?)
    }
}

/// Build a List column from per-row values. An empty column keeps the inner dtype.
pub(crate) fn list_column<T>(name: &str, lists: impl IntoIterator<Item = Vec<T>>, inner: DataType) -> Column
where
    Series: NamedFrom<Vec<T>, [T]>,
{
    let mut lists = lists.into_iter().map(|values| Series::new("".into(), values)).peekable();
    if lists.peek().is_none() {
        return Column::new_empty(name.into(), &DataType::List(Box::new(inner)));
    }
    lists.collect::<ListChunked>().with_name(name.into()).into_series().into()
}

/// Counts collected while building the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogReport {
    pub records: usize,
    pub rows_added: usize,
    /// Records skipped because their geometry is not a single polyline.
    pub geometry_skipped: usize,
    /// Canonical records without a usable CompKey.
    pub unkeyed: usize,
    /// Speed or arterial values that could not be parsed.
    pub invalid_values: usize,
}

/// A row waiting for its neighborhood membership.
#[derive(Debug)]
struct PendingRow {
    key: CompKey,
    name: String,
    line: LineString<f64>,
    speed: i64,
    road: ArterialClass,
}

/// Accumulates first-seen street segments across datasets.
#[derive(Debug)]
pub struct CatalogBuilder<'a> {
    index: &'a NeighborhoodIndex,
    pending: Vec<PendingRow>,
    seen: HashSet<CompKey>,
    report: CatalogReport,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(index: &'a NeighborhoodIndex) -> Self {
        Self { index, pending: Vec::new(), seen: HashSet::new(), report: CatalogReport::default() }
    }

    /// Parse speed limit and arterial class, falling back to their sentinels.
    fn attributes(&mut self, speed: &RawField, arterial: &RawField) -> (i64, ArterialClass) {
        let speed = match speed.as_int(scheme::SPEEDLIMIT) {
            Ok(value) => value.unwrap_or(UNKNOWN),
            Err(err) => {
                tracing::debug!(%err, "unknown speed limit");
                self.report.invalid_values += 1;
                UNKNOWN
            }
        };
        let road = match arterial.as_int(scheme::ARTCLASS) {
            Ok(None) => ArterialClass::NotDesignated,
            Ok(Some(code)) => ArterialClass::from_code(code).unwrap_or_else(|| {
                tracing::debug!(code, "arterial class out of range");
                self.report.invalid_values += 1;
                ArterialClass::NotDesignated
            }),
            Err(err) => {
                tracing::debug!(%err, "unknown arterial class");
                self.report.invalid_values += 1;
                ArterialClass::NotDesignated
            }
        };
        (speed, road)
    }

    /// Add a row for every key of a record not seen before.
    fn add(
        &mut self,
        keys: &KeyList,
        name: Option<&str>,
        geometry: &std::result::Result<MultiLineString<f64>, GeometryError>,
        attributes: Option<(&RawField, &RawField)>,
    ) {
        self.report.records += 1;
        let new_keys = keys.iter().filter(|key| !self.seen.contains(key)).collect::<Vec<_>>();
        if new_keys.is_empty() { return }

        let line = match geometry {
            Ok(parts) => resolve_polyline(parts),
            Err(err) => Err(err.clone()),
        };
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(keys = %keys, %err, "skipping record with unusable geometry");
                self.report.geometry_skipped += 1;
                return;
            }
        };

        let (speed, road) = match attributes {
            Some((speed, arterial)) => self.attributes(speed, arterial),
            None => (UNKNOWN, ArterialClass::NotDesignated),
        };

        for key in new_keys {
            self.seen.insert(key);
            self.pending.push(PendingRow {
                key,
                name: name.unwrap_or_default().to_string(),
                line: line.clone(),
                speed,
                road,
            });
        }
    }

    /// Add the canonical streets dataset, the only source of speed and arterial attributes.
    pub fn add_streets(&mut self, dataset: &Dataset) -> Result<()> {
        if dataset.schema.kind != DatasetKind::Streets {
            return Err(Error::Config(format!("dataset {} is not the streets dataset", dataset.schema.kind)));
        }
        let before = self.pending.len();
        for record in &dataset.records {
            let keys = match record.comp_key.as_keys() {
                Ok(Some(keys)) => keys,
                Ok(None) => { self.report.unkeyed += 1; continue }
                Err(err) => {
                    tracing::warn!(%err, "skipping street without a usable CompKey");
                    self.report.unkeyed += 1;
                    self.report.invalid_values += 1;
                    continue;
                }
            };
            self.add(&keys, record.name.as_deref(), &record.geometry, Some((&record.speed, &record.arterial)));
        }
        tracing::info!(dataset = "streets", added = self.pending.len() - before, "added road segments");
        Ok(())
    }

    /// Add segments of a reconciled yearly dataset.
    pub fn add_yearly(&mut self, dataset: &LinkedDataset) {
        let before = self.pending.len();
        for record in &dataset.records {
            self.add(&record.keys, record.name.as_deref(), &record.geometry, None);
        }
        tracing::info!(dataset = dataset.year, added = self.pending.len() - before, "added road segments");
    }

    /// Compute neighborhood membership for every row and produce the catalog.
    pub fn finish(self) -> (StreetCatalog, CatalogReport) {
        let index = self.index;
        let memberships = self.pending.par_iter()
            .map(|row| index.neighborhoods_containing(&row.line.0))
            .collect::<Vec<_>>();

        let rows = self.pending.into_iter().zip(memberships)
            .map(|(row, nbhd)| CatalogRow {
                key: row.key,
                name: row.name,
                lon: row.line.0.iter().map(|c| c.x).collect(),
                lat: row.line.0.iter().map(|c| c.y).collect(),
                speed: row.speed,
                road: row.road,
                nbhd,
            })
            .collect::<Vec<_>>();

        let mut report = self.report;
        report.rows_added = rows.len();

        let index = rows.iter().enumerate().map(|(pos, row)| (row.key, pos)).collect();
        (StreetCatalog { rows, index, flows: BTreeMap::new() }, report)
    }
}

/// Build the catalog from the canonical streets dataset followed by the yearly
/// datasets, oldest year first. The first occurrence of a key wins.
pub fn build_catalog(
    index: &NeighborhoodIndex,
    streets: &Dataset,
    yearly: &[LinkedDataset],
) -> Result<(StreetCatalog, CatalogReport)> {
    let mut builder = CatalogBuilder::new(index);
    builder.add_streets(streets)?;

    let mut ordered = yearly.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|dataset| dataset.year);
    ordered.into_iter().for_each(|dataset| builder.add_yearly(dataset));

    let (catalog, report) = builder.finish();
    tracing::info!(
        rows = report.rows_added,
        geometry_skipped = report.geometry_skipped,
        invalid_values = report.invalid_values,
        "built street catalog",
    );
    Ok((catalog, report))
}
