//! Street segments: loading, identifier reconciliation, catalog building and flow attachment.

mod catalog;
mod chart;
mod flow;
mod keys;
mod reconcile;
mod record;
mod scheme;

pub use catalog::{build_catalog, ArterialClass, CatalogBuilder, CatalogReport, CatalogRow, StreetCatalog, UNKNOWN};
pub use chart::{flow_chart, speed_chart};
pub use flow::{attach_flow, FlowReport};
pub use keys::{CompKey, FlowLink, FlowSegId, KeyList, KEY_ONLY, MISSING_FLOW_SEG_ID};
pub use reconcile::{
    reconcile, IdentifierMapping, KeyReconciler, LinkedDataset, LinkedRecord,
    ReconcileOptions, ReconcileReport, Reconciliation,
};
pub use record::{Dataset, RawField, StreetRecord};
pub use scheme::{DatasetKind, DatasetSchema, IdScheme, FLOW_YEARS};
