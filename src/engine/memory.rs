//! In-memory backend
//!
//! Implements all three service traits over data held in memory. Used by
//! the test suites and for prototyping without a live logging service.
//!
//! - Wildcard patterns use `%` for any sequence of characters. Every other
//!   character, `_` included, matches itself.
//! - Fundamentals are variables of type [`DataType::Fundamental`]; a
//!   fundamental is active at each of its record stamps. Filtering keeps
//!   records whose stamp equals a stamp of one of the requested
//!   fundamentals.
//! - Alignment takes, for each master stamp, the last sample at or before
//!   it, else the first sample after it. A variable with no samples yields a
//!   null record per master stamp.
//! - Fixed-interval scaling uses [`bucketize`] and only accepts scalar
//!   numeric variables. REPEAT and INTERPOLATE over more than
//!   [`MAX_DENSE_BUCKETS`] buckets are rejected.
//!
//! All data is lost when the backend is dropped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::dataset::{Dataset, RawValue, Record};
use crate::engine::traits::{
    FillService, HierarchyHandle, MetaService, TimeseriesService, VariableStatistics,
    VectorElements,
};
use crate::error::{Error, Result};
use crate::fill::{BeamModeValue, FillRecord};
use crate::retrieval::{bucketize, TimeScaling, MAX_DENSE_BUCKETS};
use crate::types::{DataType, Instant, Variable, VariableSet};

/// In-memory logging backend
pub struct InMemoryBackend {
    /// Registered variables in registration order
    variables: RwLock<Vec<Variable>>,
    /// Records per variable, ordered by stamp
    series: RwLock<HashMap<String, Vec<Record>>>,
    /// Vector element names per variable
    vector_elements: RwLock<HashMap<String, Vec<VectorElements>>>,
    /// Fills by number
    fills: RwLock<BTreeMap<u32, FillRecord>>,
    /// Hierarchy groupings
    hierarchy: RwLock<HierarchyStore>,
    /// Statistics
    stats: BackendStatsAtomic,
}

#[derive(Default)]
struct HierarchyStore {
    top: Vec<HierarchyHandle>,
    children: HashMap<String, Vec<HierarchyHandle>>,
    attached: HashMap<String, Vec<String>>,
}

struct BackendStatsAtomic {
    meta_queries: AtomicU64,
    data_queries: AtomicU64,
    hierarchy_queries: AtomicU64,
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            variables: RwLock::new(Vec::new()),
            series: RwLock::new(HashMap::new()),
            vector_elements: RwLock::new(HashMap::new()),
            fills: RwLock::new(BTreeMap::new()),
            hierarchy: RwLock::new(HierarchyStore::default()),
            stats: BackendStatsAtomic {
                meta_queries: AtomicU64::new(0),
                data_queries: AtomicU64::new(0),
                hierarchy_queries: AtomicU64::new(0),
            },
        }
    }

    /// Register a variable; re-registering a name replaces its metadata
    pub fn add_variable(&self, variable: Variable) {
        let mut vars = self.variables.write();
        match vars.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => *existing = variable,
            None => vars.push(variable),
        }
    }

    /// Append records to a variable's series
    pub fn add_records(&self, name: &str, records: impl IntoIterator<Item = Record>) {
        let mut series = self.series.write();
        let entry = series.entry(name.to_string()).or_default();
        entry.extend(records);
        entry.sort_by_key(|r| r.stamp);
    }

    /// Append floating-point scalar samples
    pub fn add_samples(&self, name: &str, samples: &[(Instant, f64)]) {
        self.add_records(
            name,
            samples
                .iter()
                .map(|(t, v)| Record::new(*t, RawValue::Double(*v))),
        );
    }

    /// Mark a fundamental as active at each of `stamps`
    pub fn add_fundamental(&self, name: &str, stamps: &[Instant]) {
        self.add_variable(Variable::new(name, DataType::Fundamental));
        self.add_records(name, stamps.iter().map(|t| Record::new(*t, RawValue::Marker)));
    }

    /// Record a vector element naming valid from `elements.stamp`
    pub fn add_vector_elements(&self, name: &str, elements: VectorElements) {
        let mut map = self.vector_elements.write();
        let entry = map.entry(name.to_string()).or_default();
        entry.push(elements);
        entry.sort_by_key(|e| e.stamp);
    }

    /// Register or replace a fill
    pub fn add_fill(&self, fill: FillRecord) {
        self.fills.write().insert(fill.fill_number, fill);
    }

    /// Register a grouping under `parent`, or at the top level
    pub fn add_hierarchy(&self, parent: Option<&HierarchyHandle>, handle: HierarchyHandle) {
        let mut store = self.hierarchy.write();
        match parent {
            None => store.top.push(handle),
            Some(p) => store.children.entry(p.id.clone()).or_default().push(handle),
        }
    }

    /// Attach variable names to a grouping
    pub fn attach_variables(&self, handle: &HierarchyHandle, names: &[&str]) {
        let mut store = self.hierarchy.write();
        store
            .attached
            .entry(handle.id.clone())
            .or_default()
            .extend(names.iter().map(|n| n.to_string()));
    }

    /// Number of metadata queries served
    pub fn meta_queries(&self) -> u64 {
        self.stats.meta_queries.load(Ordering::Relaxed)
    }

    /// Number of sample queries served
    pub fn data_queries(&self) -> u64 {
        self.stats.data_queries.load(Ordering::Relaxed)
    }

    /// Number of hierarchy queries served
    pub fn hierarchy_queries(&self) -> u64 {
        self.stats.hierarchy_queries.load(Ordering::Relaxed)
    }

    fn window(&self, name: &str, start: Instant, end: Instant) -> Vec<Record> {
        self.series
            .read()
            .get(name)
            .map(|recs| {
                recs.iter()
                    .filter(|r| r.stamp >= start && r.stamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn count_data(&self) {
        self.stats.data_queries.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Wildcard match where `%` is the only wildcard
pub fn like_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        match p.get(pi) {
            Some('%') => {
                backtrack = Some((pi, ni));
                pi += 1;
            }
            Some(&c) if c == n[ni] => {
                pi += 1;
                ni += 1;
            }
            _ => match backtrack {
                Some((bp, bn)) => {
                    pi = bp + 1;
                    ni = bn + 1;
                    backtrack = Some((bp, bn + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|c| *c == '%')
}

// =============================================================================
// MetaService
// =============================================================================

impl MetaService for InMemoryBackend {
    fn variables_like(&self, pattern: &str) -> Result<VariableSet> {
        self.stats.meta_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .variables
            .read()
            .iter()
            .filter(|v| like_match(pattern, &v.name))
            .cloned()
            .collect())
    }

    fn variables_named(&self, names: &[String]) -> Result<VariableSet> {
        self.stats.meta_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .variables
            .read()
            .iter()
            .filter(|v| names.contains(&v.name))
            .cloned()
            .collect())
    }

    fn fundamentals_like(&self, start: Instant, end: Instant, pattern: &str) -> Result<Vec<String>> {
        self.stats.meta_queries.fetch_add(1, Ordering::Relaxed);
        let candidates: Vec<String> = self
            .variables
            .read()
            .iter()
            .filter(|v| v.datatype == DataType::Fundamental && like_match(pattern, &v.name))
            .map(|v| v.name.clone())
            .collect();
        Ok(candidates
            .into_iter()
            .filter(|name| !self.window(name, start, end).is_empty())
            .collect())
    }

    fn vector_elements(&self, variable: &Variable) -> Result<Vec<VectorElements>> {
        self.stats.meta_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .vector_elements
            .read()
            .get(&variable.name)
            .cloned()
            .unwrap_or_default())
    }

    fn top_level_hierarchies(&self) -> Result<Vec<HierarchyHandle>> {
        self.stats.hierarchy_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self.hierarchy.read().top.clone())
    }

    fn child_hierarchies(&self, parent: &HierarchyHandle) -> Result<Vec<HierarchyHandle>> {
        self.stats.hierarchy_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .hierarchy
            .read()
            .children
            .get(&parent.id)
            .cloned()
            .unwrap_or_default())
    }

    fn variables_attached_to(&self, handle: &HierarchyHandle) -> Result<Vec<String>> {
        self.stats.hierarchy_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .hierarchy
            .read()
            .attached
            .get(&handle.id)
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// TimeseriesService
// =============================================================================

impl TimeseriesService for InMemoryBackend {
    fn data_in_window(&self, variable: &Variable, start: Instant, end: Instant) -> Result<Dataset> {
        self.count_data();
        let records = self.window(&variable.name, start, end);
        Ok(Dataset::new(&variable.name, variable.datatype, records))
    }

    fn data_filtered_by_fundamentals(
        &self,
        variable: &Variable,
        start: Instant,
        end: Instant,
        fundamentals: &[String],
    ) -> Result<Dataset> {
        self.count_data();
        let active: HashSet<Instant> = fundamentals
            .iter()
            .flat_map(|f| self.window(f, start, end))
            .map(|r| r.stamp)
            .collect();
        let records = self
            .window(&variable.name, start, end)
            .into_iter()
            .filter(|r| active.contains(&r.stamp))
            .collect();
        Ok(Dataset::new(&variable.name, variable.datatype, records))
    }

    fn data_aligned_to(&self, variable: &Variable, master: &Dataset) -> Result<Dataset> {
        self.count_data();
        let series = self.series.read();
        let recs = series
            .get(&variable.name)
            .map(|recs| recs.as_slice())
            .unwrap_or_default();

        // A variable with nothing logged still yields one null per master stamp
        let aligned = master
            .records()
            .iter()
            .map(|m| {
                let after = recs.partition_point(|r| r.stamp <= m.stamp);
                let value = match recs.get(after.saturating_sub(1)) {
                    Some(source) => source.value.clone(),
                    None => RawValue::Other(serde_json::Value::Null),
                };
                Record::new(m.stamp, value)
            })
            .collect();
        Ok(Dataset::new(&variable.name, variable.datatype, aligned))
    }

    fn last_before(&self, variable: &Variable, at: Instant) -> Result<Option<Dataset>> {
        self.count_data();
        let series = self.series.read();
        let found = series
            .get(&variable.name)
            .and_then(|recs| recs.iter().rev().find(|r| r.stamp < at).cloned());
        Ok(found.map(|r| Dataset::new(&variable.name, variable.datatype, vec![r])))
    }

    fn next_after(&self, variable: &Variable, at: Instant) -> Result<Option<Dataset>> {
        self.count_data();
        let series = self.series.read();
        let found = series
            .get(&variable.name)
            .and_then(|recs| recs.iter().find(|r| r.stamp > at).cloned());
        Ok(found.map(|r| Dataset::new(&variable.name, variable.datatype, vec![r])))
    }

    fn statistics(
        &self,
        variables: &VariableSet,
        start: Instant,
        end: Instant,
    ) -> Result<Vec<VariableStatistics>> {
        self.count_data();
        Ok(variables
            .iter()
            .map(|v| {
                let samples: Vec<(Instant, f64)> = self
                    .window(&v.name, start, end)
                    .iter()
                    .filter_map(|r| r.value.as_f64().map(|x| (r.stamp, x)))
                    .collect();
                summarize(&v.name, &samples)
            })
            .collect())
    }

    fn data_in_fixed_intervals(
        &self,
        variable: &Variable,
        start: Instant,
        end: Instant,
        scaling: &TimeScaling,
    ) -> Result<Dataset> {
        self.count_data();
        if variable.datatype != DataType::Numeric {
            return Err(Error::backend(format!(
                "cannot scale {} variable {}",
                variable.datatype, variable.name
            )));
        }
        if scaling.algorithm.is_dense() && scaling.bucket_count(start, end) > MAX_DENSE_BUCKETS {
            return Err(Error::backend(format!(
                "{} spans more than {} buckets",
                scaling, MAX_DENSE_BUCKETS
            )));
        }
        let samples: Vec<(Instant, f64)> = self
            .window(&variable.name, start, end)
            .iter()
            .filter_map(|r| r.value.as_f64().map(|x| (r.stamp, x)))
            .collect();
        let records = bucketize(&samples, start, end, scaling)
            .into_iter()
            .map(|(t, v)| Record::new(t, RawValue::Double(v)))
            .collect();
        Ok(Dataset::new(&variable.name, variable.datatype, records))
    }
}

/// Population statistics over time-ordered samples
fn summarize(name: &str, samples: &[(Instant, f64)]) -> VariableStatistics {
    let count = samples.len();
    let mut out = VariableStatistics {
        variable: name.to_string(),
        count: count as u64,
        min_stamp: samples.first().map(|s| s.0),
        max_stamp: samples.last().map(|s| s.0),
        min: f64::NAN,
        max: f64::NAN,
        avg: f64::NAN,
        std_dev: f64::NAN,
    };
    if count == 0 {
        return out;
    }

    let values = samples.iter().map(|s| s.1);
    out.min = values.clone().fold(f64::INFINITY, f64::min);
    out.max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.clone().sum::<f64>() / count as f64;
    let var = values.map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
    out.avg = mean;
    out.std_dev = var.sqrt();
    out
}

// =============================================================================
// FillService
// =============================================================================

impl FillService for InMemoryBackend {
    fn fill_by_number(&self, fill_number: u32) -> Result<Option<FillRecord>> {
        Ok(self.fills.read().get(&fill_number).cloned())
    }

    fn last_completed_fill(&self) -> Result<Option<FillRecord>> {
        Ok(self
            .fills
            .read()
            .values()
            .rev()
            .find(|f| f.end.is_some())
            .cloned())
    }

    fn fills_in_window(&self, start: Instant, end: Instant) -> Result<Vec<u32>> {
        Ok(self
            .fills
            .read()
            .values()
            .filter(|f| f.overlaps(start, end))
            .map(|f| f.fill_number)
            .collect())
    }

    fn fills_in_window_with_modes(
        &self,
        start: Instant,
        end: Instant,
        modes: &[BeamModeValue],
    ) -> Result<Vec<u32>> {
        Ok(self
            .fills
            .read()
            .values()
            .filter(|f| f.overlaps(start, end) && f.has_any_mode(modes))
            .map(|f| f.fill_number)
            .collect())
    }
}
