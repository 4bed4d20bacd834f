use std::fmt;

use crate::error::{Error, Result};

pub(crate) const COMPKEY: &str = "COMPKEY";
pub(crate) const FLOWSEGID: &str = "FLOWSEGID";
pub(crate) const SPEEDLIMIT: &str = "SPEEDLIMIT";
pub(crate) const ARTCLASS: &str = "ARTCLASS";

/// Which identifier columns a dataset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// FLOWSEGID plus a (possibly comma-joined) COMPKEY.
    FlowAndKeys,
    /// FLOWSEGID only, float-encoded and occasionally NaN.
    FlowOnly,
    /// COMPKEY only.
    KeysOnly,
}

/// Where a dataset comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    /// The canonical street-geometry dataset (speed limits and arterial classes).
    Streets,
    /// A yearly traffic-flow-count dataset.
    Flow(u16),
}

impl DatasetKind {
    pub fn year(self) -> Option<u16> {
        match self {
            Self::Streets => None,
            Self::Flow(year) => Some(year),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streets => f.write_str("streets"),
            Self::Flow(year) => write!(f, "{year}"),
        }
    }
}

/// Column layout of one dataset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSchema {
    pub kind: DatasetKind,
    pub ids: IdScheme,
    pub name_column: &'static str,
    /// Flow column; absent for the canonical streets dataset.
    pub flow_column: Option<&'static str>,
}

/// Years with a known traffic-flow schema.
pub const FLOW_YEARS: std::ops::RangeInclusive<u16> = 2007..=2018;

impl DatasetSchema {
    /// Schema of the canonical streets dataset.
    pub const STREETS: Self = Self {
        kind: DatasetKind::Streets,
        ids: IdScheme::KeysOnly,
        name_column: "STNAME_ORD",
        flow_column: None,
    };

    /// Look up the fixed schema of a yearly flow dataset.
    pub fn for_year(year: u16) -> Result<Self> {
        let (ids, name_column, flow_column) = match year {
            2007..=2014 => (IdScheme::KeysOnly, "STNAME", "AAWDT"),
            2015..=2016 => (IdScheme::FlowOnly, "FIRST_STNA", "COUNTAAWDT"),
            2017..=2018 => (IdScheme::FlowAndKeys, "STNAME_ORD", "AWDT"),
            _ => return Err(Error::Config(format!("no traffic flow schema is known for year {year}"))),
        };
        Ok(Self { kind: DatasetKind::Flow(year), ids, name_column, flow_column: Some(flow_column) })
    }

    /// Columns whose absence makes the dataset unusable.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut columns = match self.ids {
            IdScheme::FlowAndKeys => vec![FLOWSEGID, COMPKEY],
            IdScheme::FlowOnly => vec![FLOWSEGID],
            IdScheme::KeysOnly => vec![COMPKEY],
        };
        columns.push(self.name_column);
        columns.extend(self.flow_column);
        columns
    }
}
