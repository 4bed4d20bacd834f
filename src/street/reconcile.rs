use std::collections::{BTreeMap, BTreeSet, HashSet};

use geo::MultiLineString;

use crate::error::{Error, GeometryError, Result};
use super::{
    keys::{CompKey, FlowLink, FlowSegId, KeyList, MISSING_FLOW_SEG_ID},
    record::{Dataset, RawField, StreetRecord},
    scheme::{DatasetKind, IdScheme},
};

/// Bidirectional mapping between FlowSegIds and CompKeys.
///
/// For every `(flow, keys)` in the forward map each key maps back to `flow`, and every
/// key mapped to a `Segment(flow)` is listed under `flow`. Keys mapped to `KeyOnly`
/// have no forward entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMapping {
    flow_to_keys: BTreeMap<FlowSegId, KeyList>,
    key_to_flow: BTreeMap<CompKey, FlowLink>,
}

impl IdentifierMapping {
    pub fn keys_for(&self, flow: FlowSegId) -> Option<&KeyList> { self.flow_to_keys.get(&flow) }

    pub fn flow_for(&self, key: CompKey) -> Option<FlowLink> { self.key_to_flow.get(&key).copied() }

    pub fn flow_to_keys(&self) -> &BTreeMap<FlowSegId, KeyList> { &self.flow_to_keys }

    pub fn key_to_flow(&self) -> &BTreeMap<CompKey, FlowLink> { &self.key_to_flow }

    /// Check that the forward and reverse maps agree in both directions.
    pub fn is_consistent(&self) -> bool {
        let forward = self.flow_to_keys.iter()
            .all(|(&flow, keys)| keys.iter().all(|key| self.flow_for(key) == Some(FlowLink::Segment(flow))));
        let reverse = self.key_to_flow.iter()
            .all(|(&key, &link)| match link {
                FlowLink::Segment(flow) => self.keys_for(flow).is_some_and(|keys| keys.contains(key)),
                FlowLink::KeyOnly => true,
            });
        forward && reverse
    }
}

/// A yearly record with resolved keys and flow routing.
#[derive(Debug, Clone)]
pub struct LinkedRecord {
    pub keys: KeyList,
    pub link: FlowLink,
    pub name: Option<String>,
    pub geometry: std::result::Result<MultiLineString<f64>, GeometryError>,
    pub flow: RawField,
}

/// A yearly dataset after reconciliation.
#[derive(Debug, Clone)]
pub struct LinkedDataset {
    pub year: u16,
    pub ids: IdScheme,
    pub records: Vec<LinkedRecord>,
}

/// Counts collected while reconciling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub records: usize,
    pub synthetic_keys: usize,
    /// Key-only records without a usable CompKey (dropped).
    pub unkeyed: usize,
    /// Keys already claimed by a different FlowSegId (newer claim kept).
    pub key_conflicts: usize,
    /// Key lists replaced under the override rule.
    pub overrides: usize,
    /// Identifier fields that could not be parsed.
    pub invalid_values: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// First value of the synthetic CompKey range.
    pub synthetic_key_base: CompKey,
    /// FlowSegIds whose key list may be replaced by an older dataset's list.
    pub key_list_overrides: Vec<FlowSegId>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self { synthetic_key_base: 1_000_000, key_list_overrides: vec![604] }
    }
}

/// Output of [`reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub mapping: IdentifierMapping,
    /// Linked datasets, newest year first.
    pub datasets: Vec<LinkedDataset>,
    pub synthetic_keys: BTreeSet<CompKey>,
    pub report: ReconcileReport,
}

/// One reconciliation session: owns the mapping and the synthetic-key counter.
#[derive(Debug)]
pub struct KeyReconciler {
    mapping: IdentifierMapping,
    next_key: CompKey,
    reserved: HashSet<CompKey>,
    overrides: HashSet<FlowSegId>,
    synthetic: BTreeSet<CompKey>,
    report: ReconcileReport,
}

impl KeyReconciler {
    /// Start a session. `reserved` holds every real CompKey seen in any input, which
    /// synthetic allocation will skip.
    pub fn new(options: &ReconcileOptions, reserved: impl IntoIterator<Item = CompKey>) -> Self {
        Self {
            mapping: IdentifierMapping::default(),
            next_key: options.synthetic_key_base,
            reserved: reserved.into_iter().collect(),
            overrides: options.key_list_overrides.iter().copied().collect(),
            synthetic: BTreeSet::new(),
            report: ReconcileReport::default(),
        }
    }

    /// Allocate the next synthetic key not used by any real or mapped key.
    fn allocate(&mut self) -> CompKey {
        while self.reserved.contains(&self.next_key) || self.mapping.key_to_flow.contains_key(&self.next_key) {
            self.next_key += 1;
        }
        let key = self.next_key;
        self.next_key += 1;
        self.synthetic.insert(key);
        self.report.synthetic_keys += 1;
        key
    }

    /// Keys already registered for `flow`, or a fresh synthetic key registered for it.
    fn keys_or_allocate(&mut self, flow: FlowSegId) -> KeyList {
        if let Some(keys) = self.mapping.flow_to_keys.get(&flow) {
            return keys.clone();
        }
        let key = self.allocate();
        tracing::debug!(flow, key, "allocated synthetic key");
        self.mapping.flow_to_keys.insert(flow, KeyList::single(key));
        self.mapping.key_to_flow.insert(key, FlowLink::Segment(flow));
        KeyList::single(key)
    }

    /// Register `keys` under `flow` in both directions.
    fn register(&mut self, flow: FlowSegId, keys: &KeyList) {
        let mut claimed = KeyList::default();
        for key in keys.iter() {
            match self.mapping.key_to_flow.get(&key) {
                Some(&FlowLink::Segment(other)) if other != flow => {
                    tracing::debug!(key, flow, claimed_by = other, "key already claimed by another flow segment");
                    self.report.key_conflicts += 1;
                }
                _ => claimed.push(key),
            }
        }

        match self.mapping.flow_to_keys.get(&flow).cloned() {
            None if claimed.is_empty() => {}
            None => {
                claimed.iter().for_each(|key| { self.mapping.key_to_flow.insert(key, FlowLink::Segment(flow)); });
                self.mapping.flow_to_keys.insert(flow, claimed);
            }
            Some(existing) if existing == claimed => {}
            Some(_) if self.overrides.contains(&flow) => {
                tracing::info!(flow, keys = %claimed, "replacing key list under override rule");
                if let Some(previous) = self.mapping.flow_to_keys.insert(flow, claimed.clone()) {
                    previous.iter()
                        .filter(|&key| !claimed.contains(key))
                        .for_each(|key| { self.mapping.key_to_flow.remove(&key); });
                }
                claimed.iter().for_each(|key| { self.mapping.key_to_flow.insert(key, FlowLink::Segment(flow)); });
                self.report.overrides += 1;
            }
            // Older key lists defer to the newer registration.
            Some(existing) => tracing::debug!(flow, kept = %existing, ignored = %claimed, "keeping newer key list"),
        }
    }

    /// Resolve a key-only record through already-registered flow segments.
    fn link_keys(&mut self, keys: &KeyList) -> FlowLink {
        let links = keys.iter().map(|key| self.mapping.flow_for(key)).collect::<Vec<_>>();
        match links.first().copied().flatten() {
            Some(FlowLink::Segment(flow)) if links.iter().all(|&link| link == Some(FlowLink::Segment(flow))) => {
                FlowLink::Segment(flow)
            }
            _ => {
                keys.iter().for_each(|key| { self.mapping.key_to_flow.entry(key).or_insert(FlowLink::KeyOnly); });
                FlowLink::KeyOnly
            }
        }
    }

    /// Parse a FLOWSEGID, collapsing missing values onto the shared sentinel.
    fn flow_seg_id(&mut self, field: &RawField) -> FlowSegId {
        match field.as_int(super::scheme::FLOWSEGID) {
            Ok(Some(flow)) => flow,
            Ok(None) => MISSING_FLOW_SEG_ID,
            Err(err) => {
                tracing::debug!(%err, "treating unparseable flow segment id as missing");
                self.report.invalid_values += 1;
                MISSING_FLOW_SEG_ID
            }
        }
    }

    fn link_record(&mut self, ids: IdScheme, record: StreetRecord) -> Option<LinkedRecord> {
        let (keys, link) = match ids {
            IdScheme::FlowAndKeys => {
                let flow = self.flow_seg_id(&record.flow_seg_id);
                let keys = match record.comp_key.as_keys() {
                    Ok(Some(keys)) => { self.register(flow, &keys); keys }
                    Ok(None) => self.keys_or_allocate(flow),
                    Err(err) => {
                        tracing::debug!(%err, "allocating key for unparseable CompKey");
                        self.report.invalid_values += 1;
                        self.keys_or_allocate(flow)
                    }
                };
                (keys, FlowLink::Segment(flow))
            }
            IdScheme::FlowOnly => {
                let flow = self.flow_seg_id(&record.flow_seg_id);
                (self.keys_or_allocate(flow), FlowLink::Segment(flow))
            }
            IdScheme::KeysOnly => {
                let keys = match record.comp_key.as_keys() {
                    Ok(Some(keys)) => keys,
                    Ok(None) => { self.report.unkeyed += 1; return None }
                    Err(err) => {
                        tracing::warn!(%err, "dropping record without a usable CompKey");
                        self.report.invalid_values += 1;
                        self.report.unkeyed += 1;
                        return None;
                    }
                };
                let link = self.link_keys(&keys);
                (keys, link)
            }
        };

        Some(LinkedRecord { keys, link, name: record.name, geometry: record.geometry, flow: record.flow })
    }

    /// Reconcile one yearly dataset. Datasets must be fed newest year first.
    pub fn reconcile_dataset(&mut self, dataset: Dataset) -> Result<LinkedDataset> {
        let DatasetKind::Flow(year) = dataset.schema.kind else {
            return Err(Error::Config("the streets dataset has no flow identifiers to reconcile".into()));
        };
        let ids = dataset.schema.ids;
        let before = self.report.clone();

        let records = dataset.records.into_iter()
            .filter_map(|record| self.link_record(ids, record))
            .collect::<Vec<_>>();
        self.report.records += records.len();

        tracing::info!(
            year,
            records = records.len(),
            synthetic_keys = self.report.synthetic_keys - before.synthetic_keys,
            unkeyed = self.report.unkeyed - before.unkeyed,
            "reconciled identifiers",
        );
        Ok(LinkedDataset { year, ids, records })
    }

    pub fn finish(self, datasets: Vec<LinkedDataset>) -> Reconciliation {
        Reconciliation { mapping: self.mapping, datasets, synthetic_keys: self.synthetic, report: self.report }
    }
}

/// Reconcile all yearly datasets, processing them newest year first.
pub fn reconcile(
    mut datasets: Vec<Dataset>,
    reserved: impl IntoIterator<Item = CompKey>,
    options: &ReconcileOptions,
) -> Result<Reconciliation> {
    datasets.sort_by_key(|dataset| std::cmp::Reverse(dataset.schema.kind));

    let mut reconciler = KeyReconciler::new(options, reserved);
    let linked = datasets.into_iter()
        .map(|dataset| reconciler.reconcile_dataset(dataset))
        .collect::<Result<Vec<_>>>()?;

    debug_assert!(reconciler.mapping.is_consistent());
    Ok(reconciler.finish(linked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::street::scheme::DatasetSchema;

    fn line() -> StreetRecord { StreetRecord::new(vec![vec![(0.0, 0.0), (1.0, 1.0)]]) }

    fn year(year: u16, records: Vec<StreetRecord>) -> Dataset {
        Dataset::new(DatasetSchema::for_year(year).unwrap(), records)
    }

    fn run(datasets: Vec<Dataset>) -> Reconciliation {
        let reserved = datasets.iter().flat_map(|d| d.real_keys().collect::<Vec<_>>()).collect::<Vec<_>>();
        reconcile(datasets, reserved, &ReconcileOptions::default()).unwrap()
    }

    fn keys(s: &str) -> KeyList { s.parse().unwrap() }

    #[test]
    fn multi_key_flow_segment_maps_both_ways() {
        let out = run(vec![year(2018, vec![line().with_flow_seg_id(42.0).with_keys("100,101")])]);
        assert_eq!(out.mapping.keys_for(42).unwrap().to_string(), "100,101");
        assert_eq!(out.mapping.flow_for(100), Some(FlowLink::Segment(42)));
        assert_eq!(out.mapping.flow_for(101), Some(FlowLink::Segment(42)));
        assert!(out.mapping.is_consistent());
    }

    #[test]
    fn missing_keys_reuse_newer_synthetic_assignment() {
        let out = run(vec![
            year(2017, vec![line().with_flow_seg_id(9.0)]),
            year(2018, vec![line().with_flow_seg_id(9.0)]),
        ]);
        assert_eq!(out.report.synthetic_keys, 1);
        assert_eq!(out.datasets[0].year, 2018);
        assert_eq!(out.datasets[0].records[0].keys, KeyList::single(1_000_000));
        assert_eq!(out.datasets[1].records[0].keys, KeyList::single(1_000_000));
        assert_eq!(out.mapping.flow_for(1_000_000), Some(FlowLink::Segment(9)));
    }

    #[test]
    fn flow_only_years_reuse_registered_key_lists() {
        let out = run(vec![
            year(2018, vec![line().with_flow_seg_id(42.0).with_keys("100,101")]),
            year(2015, vec![line().with_flow_seg_id(42.0), line().with_flow_seg_id(43.0)]),
        ]);
        let linked = &out.datasets[1].records;
        assert_eq!(linked[0].keys, keys("100,101"));
        assert_eq!(linked[0].link, FlowLink::Segment(42));
        assert_eq!(linked[1].keys, KeyList::single(1_000_000));
        assert!(out.mapping.is_consistent());
    }

    #[test]
    fn missing_flow_segment_ids_collapse_to_one_key() {
        let out = run(vec![
            year(2016, vec![line().with_flow_seg_id(f64::NAN)]),
            year(2015, vec![line(), line().with_flow_seg_id(f64::NAN)]),
        ]);
        assert_eq!(out.report.synthetic_keys, 1);
        let all_keys = out.datasets.iter()
            .flat_map(|d| d.records.iter().map(|r| r.keys.clone()))
            .collect::<Vec<_>>();
        assert!(all_keys.iter().all(|k| *k == all_keys[0]));
        assert_eq!(out.mapping.keys_for(MISSING_FLOW_SEG_ID), Some(&all_keys[0]));
    }

    #[test]
    fn legacy_key_without_flow_segment_is_key_only() {
        let out = run(vec![year(2010, vec![line().with_keys(77.0).with_flow(3000.0)])]);
        assert_eq!(out.mapping.flow_for(77), Some(FlowLink::KeyOnly));
        assert_eq!(out.mapping.flow_for(77).unwrap().raw(), -1);
        assert_eq!(out.datasets[0].records[0].link, FlowLink::KeyOnly);
        assert!(out.mapping.flow_to_keys().is_empty());
    }

    #[test]
    fn legacy_key_resolves_through_known_flow_segment() {
        let out = run(vec![
            year(2018, vec![line().with_flow_seg_id(42.0).with_keys("100,101")]),
            year(2012, vec![line().with_keys(100.0)]),
        ]);
        assert_eq!(out.datasets[1].records[0].link, FlowLink::Segment(42));
        assert_eq!(out.mapping.flow_for(100), Some(FlowLink::Segment(42)));
    }

    #[test]
    fn override_replaces_key_list() {
        let out = run(vec![
            year(2018, vec![line().with_flow_seg_id(604.0).with_keys("1,2")]),
            year(2017, vec![line().with_flow_seg_id(604.0).with_keys("1,3")]),
        ]);
        assert_eq!(out.mapping.keys_for(604), Some(&keys("1,3")));
        assert_eq!(out.mapping.flow_for(3), Some(FlowLink::Segment(604)));
        assert_eq!(out.mapping.flow_for(2), None);
        assert_eq!(out.report.overrides, 1);
        assert!(out.mapping.is_consistent());
    }

    #[test]
    fn older_key_lists_defer_without_override() {
        let out = run(vec![
            year(2018, vec![line().with_flow_seg_id(7.0).with_keys("5,6")]),
            year(2017, vec![line().with_flow_seg_id(7.0).with_keys("5,6,8")]),
        ]);
        assert_eq!(out.mapping.keys_for(7), Some(&keys("5,6")));
        assert_eq!(out.mapping.flow_for(8), None);
        assert_eq!(out.report.overrides, 0);
        assert!(out.mapping.is_consistent());
    }

    #[test]
    fn conflicting_claims_keep_first_flow() {
        let out = run(vec![year(2018, vec![
            line().with_flow_seg_id(1.0).with_keys("10"),
            line().with_flow_seg_id(2.0).with_keys("10,11"),
        ])]);
        assert_eq!(out.mapping.keys_for(2), Some(&keys("11")));
        assert_eq!(out.mapping.flow_for(10), Some(FlowLink::Segment(1)));
        assert_eq!(out.report.key_conflicts, 1);
        assert!(out.mapping.is_consistent());
    }

    #[test]
    fn synthetic_keys_skip_real_keys() {
        let out = run(vec![
            year(2018, vec![line().with_flow_seg_id(1.0), line().with_flow_seg_id(2.0).with_keys("1000000")]),
            year(2010, vec![line().with_keys(1_000_001.0)]),
        ]);
        assert_eq!(out.synthetic_keys.iter().copied().collect::<Vec<_>>(), vec![1_000_002]);
        let real = [1_000_000, 1_000_001];
        assert!(out.synthetic_keys.iter().all(|k| !real.contains(k)));
    }

    #[test]
    fn unkeyed_legacy_records_are_dropped_and_counted() {
        let out = run(vec![year(2009, vec![line(), line().with_keys("abc"), line().with_keys(5.0)])]);
        assert_eq!(out.datasets[0].records.len(), 1);
        assert_eq!(out.report.unkeyed, 2);
        assert_eq!(out.report.invalid_values, 1);
    }

    #[test]
    fn datasets_are_processed_newest_first() {
        // The 2015 record would allocate first if processed in input order.
        let out = run(vec![
            year(2015, vec![line().with_flow_seg_id(3.0)]),
            year(2018, vec![line().with_flow_seg_id(3.0).with_keys("300")]),
        ]);
        assert_eq!(out.report.synthetic_keys, 0);
        assert_eq!(out.datasets.iter().map(|d| d.year).collect::<Vec<_>>(), vec![2018, 2015]);
        assert_eq!(out.datasets[1].records[0].keys, KeyList::single(300));
    }

    #[test]
    fn streets_dataset_is_rejected() {
        let err = reconcile(vec![Dataset::new(DatasetSchema::STREETS, vec![])], [], &ReconcileOptions::default());
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn consistency_check_detects_broken_maps() {
        let mut mapping = IdentifierMapping::default();
        mapping.flow_to_keys.insert(1, keys("10,11"));
        mapping.key_to_flow.insert(10, FlowLink::Segment(1));
        assert!(!mapping.is_consistent());
        mapping.key_to_flow.insert(11, FlowLink::Segment(1));
        assert!(mapping.is_consistent());
        mapping.key_to_flow.insert(12, FlowLink::Segment(2));
        assert!(!mapping.is_consistent());
    }
}
