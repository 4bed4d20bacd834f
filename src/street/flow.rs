use super::{
    catalog::{StreetCatalog, UNKNOWN},
    keys::{FlowLink, KeyList},
    reconcile::{IdentifierMapping, LinkedDataset},
};

/// Counts collected while attaching one year's flow values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowReport {
    pub year: u16,
    pub records: usize,
    /// Catalog cells that received a known flow value.
    pub values_written: usize,
    /// Flow values that could not be parsed and were written as unknown.
    pub invalid_values: usize,
    /// Target keys without a catalog row, typically because their geometry was skipped.
    pub unmatched_keys: usize,
}

/// Attach one yearly dataset's flow values as a catalog column.
///
/// Every row starts out [`UNKNOWN`]. Records linked to a flow segment write to all
/// keys registered for that segment; key-only records write to their own keys.
pub fn attach_flow(catalog: &mut StreetCatalog, dataset: &LinkedDataset, mapping: &IdentifierMapping) -> FlowReport {
    let mut report = FlowReport { year: dataset.year, ..Default::default() };
    let mut column = vec![UNKNOWN; catalog.len()];

    for record in &dataset.records {
        report.records += 1;
        let value = match record.flow.as_int("flow") {
            Ok(value) => value.unwrap_or(UNKNOWN),
            Err(err) => {
                tracing::debug!(year = dataset.year, %err, "writing unknown flow");
                report.invalid_values += 1;
                UNKNOWN
            }
        };

        let targets: &KeyList = match record.link {
            FlowLink::Segment(flow) => mapping.keys_for(flow).unwrap_or(&record.keys),
            FlowLink::KeyOnly => &record.keys,
        };

        for key in targets.iter() {
            match catalog.position(key) {
                Some(pos) => {
                    column[pos] = value;
                    if value != UNKNOWN { report.values_written += 1 }
                }
                None => report.unmatched_keys += 1,
            }
        }
    }

    if catalog.set_flow_column(dataset.year, column).is_some() {
        tracing::warn!(year = dataset.year, "replaced existing flow column");
    }
    tracing::info!(
        year = dataset.year,
        values = report.values_written,
        unmatched_keys = report.unmatched_keys,
        "attached flow values",
    );
    report
}
