#![doc = "Seattle traffic-flow data preparation"]
pub mod cli;
pub mod commands;
mod common;
pub mod config;
mod error;
mod geom;
pub mod nbhd;
pub mod pipeline;
pub mod street;

#[doc(inline)]
pub use common::read_parquet;

#[doc(inline)]
pub use config::PipelineConfig;

#[doc(inline)]
pub use error::{Error, GeometryError, Result, ValueParseError};
