mod csv;
mod json;
mod parquet;
mod pending;
mod shp;

pub(crate) use csv::*;
pub(crate) use json::*;
pub use parquet::read_parquet;
pub(crate) use parquet::stage_parquet;
pub(crate) use pending::*;
pub(crate) use shp::*;
