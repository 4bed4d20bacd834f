use std::{fmt, str::FromStr};

use smallvec::SmallVec;

/// Primary key of a physical street segment in the asset-management system.
pub type CompKey = i64;

/// Identifier grouping one or more segments under a single flow measurement.
pub type FlowSegId = i64;

/// Raw value written for "resolve by key, not by flow segment".
pub const KEY_ONLY: FlowSegId = -1;

/// Shared FlowSegId for records whose FLOWSEGID is missing (NaN).
pub const MISSING_FLOW_SEG_ID: FlowSegId = 1_000_000;

/// How a yearly record's flow value is routed onto catalog rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowLink {
    /// Route to every key registered for this flow segment.
    Segment(FlowSegId),
    /// Route to the record's own keys.
    KeyOnly,
}

impl FlowLink {
    /// Integer encoding used in tables: the FlowSegId, or -1 for key-only records.
    pub fn raw(self) -> FlowSegId {
        match self {
            Self::Segment(id) => id,
            Self::KeyOnly => KEY_ONLY,
        }
    }
}

/// One or more CompKeys, in the order the source listed them.
///
/// Sources encode multi-segment records as a comma-joined string (`"100,101"`),
/// and synthetic keys sometimes round-trip through floats (`"1000000.0"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyList(SmallVec<[CompKey; 2]>);

impl KeyList {
    pub fn single(key: CompKey) -> Self {
        Self(SmallVec::from_slice(&[key]))
    }

    #[inline] pub fn len(&self) -> usize { self.0.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = CompKey> + '_ { self.0.iter().copied() }

    #[inline] pub fn contains(&self, key: CompKey) -> bool { self.0.contains(&key) }

    /// Append a key unless it is already listed.
    pub fn push(&mut self, key: CompKey) {
        if !self.contains(key) { self.0.push(key) }
    }
}

impl FromIterator<CompKey> for KeyList {
    fn from_iter<I: IntoIterator<Item = CompKey>>(iter: I) -> Self {
        let mut list = Self::default();
        iter.into_iter().for_each(|key| list.push(key));
        list
    }
}

impl fmt::Display for KeyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(",")? }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Parse a single key, accepting float-encoded integers.
pub(crate) fn parse_key(s: &str) -> Option<CompKey> {
    let s = s.trim();
    if let Ok(key) = s.parse::<CompKey>() { return Some(key) }
    let value = s.parse::<f64>().ok()?;
    (value.is_finite() && value.fract() == 0.0).then_some(value as CompKey)
}

impl FromStr for KeyList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let list = s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| parse_key(part).ok_or_else(|| part.trim().to_string()))
            .collect::<Result<KeyList, _>>()?;
        if list.is_empty() { return Err(s.to_string()) }
        Ok(list)
    }
}
