use std::path::PathBuf;

use thiserror::Error;

/// Boxed source error carried by the fatal variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal pipeline errors. Any of these aborts the run before output is written.
#[derive(Debug, Error)]
pub enum Error {
    /// A source file is missing, unreadable, or holds data that cannot be used at all.
    #[error("failed to load {}: {source}", path.display())]
    DataLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A dataset lacks a column its fixed identifier scheme requires.
    #[error("dataset {dataset} is missing expected column {column:?}")]
    Schema { dataset: String, column: String },

    /// The configuration names something the pipeline cannot process.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An in-memory table could not be assembled.
    #[error("table error: {0}")]
    Table(#[from] polars::error::PolarsError),

    /// An output artifact could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub(crate) fn data_load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::DataLoad { path: path.into(), source: source.into() }
    }

    pub(crate) fn schema(dataset: impl ToString, column: impl ToString) -> Self {
        Self::Schema { dataset: dataset.to_string(), column: column.to_string() }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Write { path: path.into(), source: source.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A record's geometry cannot be resolved into a single polyline. The record is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("record has no geometry")]
    Empty,
    #[error("expected a polyline, found {0}")]
    NotLinear(&'static str),
    #[error("polyline has fewer than two points")]
    Degenerate,
    #[error("{parts} polyline parts cannot be merged into one line")]
    Disjoint { parts: usize },
}

/// A numeric field could not be parsed. The field takes its "unknown" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {field} value {value:?} as an integer")]
pub struct ValueParseError {
    pub field: &'static str,
    pub value: String,
}
