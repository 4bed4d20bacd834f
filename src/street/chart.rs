use polars::prelude::*;

use crate::error::Result;
use super::catalog::{list_column, StreetCatalog, UNKNOWN};

/// Per-year, per-neighborhood lists of the known flow values of member segments.
///
/// Columns: `year`, `nbhd`, `flow` (list). Every neighborhood gets a row for every
/// attached year, with an empty list when none of its segments was counted.
pub fn flow_chart(catalog: &StreetCatalog, num_nbhds: usize) -> Result<DataFrame> {
    let mut years = Vec::new();
    let mut nbhds = Vec::new();
    let mut flows = Vec::new();

    for year in catalog.years() {
        let Some(column) = catalog.flow_column(year) else { continue };
        let mut buckets = vec![Vec::<i64>::new(); num_nbhds];
        for (row, &value) in catalog.rows().iter().zip(column) {
            if value == UNKNOWN { continue }
            for &nbhd in &row.nbhd {
                if let Some(bucket) = buckets.get_mut(nbhd as usize) { bucket.push(value) }
            }
        }
        for (nbhd, bucket) in buckets.into_iter().enumerate() {
            years.push(year as i32);
            nbhds.push(nbhd as u32);
            flows.push(bucket);
        }
    }

    Ok(DataFrame::new(vec![
        Column::new("year".into(), years),
        Column::new("nbhd".into(), nbhds),
        list_column("flow", flows, DataType::Int64),
    ])?)
}

/// Per-neighborhood lists of known speed limits and of arterial classes.
///
/// Columns: `nbhd`, `speed` (list), `road` (list).
pub fn speed_chart(catalog: &StreetCatalog, num_nbhds: usize) -> Result<DataFrame> {
    let mut speeds = vec![Vec::<i64>::new(); num_nbhds];
    let mut roads = vec![Vec::<i32>::new(); num_nbhds];

    for row in catalog.rows() {
        for &nbhd in &row.nbhd {
            let nbhd = nbhd as usize;
            if nbhd >= num_nbhds { continue }
            if row.speed != UNKNOWN { speeds[nbhd].push(row.speed) }
            roads[nbhd].push(row.road.code());
        }
    }

    Ok(DataFrame::new(vec![
        Column::new("nbhd".into(), (0..num_nbhds as u32).collect::<Vec<_>>()),
        list_column("speed", speeds, DataType::Int64),
        list_column("road", roads, DataType::Int32),
    ])?)
}
