//! Backend service traits
//!
//! The retrieval layer never talks to the logging service directly. Session
//! bootstrap and transport live behind these three traits, which are handed
//! to the client as explicit `Arc<dyn ...>` handles.
//!
//! All calls are synchronous and blocking. Implementations report transport
//! and query failures as `Error::Backend`; "nothing found" is an empty
//! collection or `None`, never an error.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::fill::{BeamModeValue, FillRecord};
use crate::retrieval::TimeScaling;
use crate::types::{Instant, Variable, VariableSet};

// =============================================================================
// MetaService Trait
// =============================================================================

/// Variable namespace, fundamentals and hierarchy listing
pub trait MetaService: Send + Sync {
    /// Variables whose name matches a `%` wildcard pattern, in discovery order
    fn variables_like(&self, pattern: &str) -> Result<VariableSet>;

    /// Variables with exactly these names; unknown names are left out
    fn variables_named(&self, names: &[String]) -> Result<VariableSet>;

    /// Names of fundamentals matching a pattern that were active in `[start, end]`
    fn fundamentals_like(&self, start: Instant, end: Instant, pattern: &str)
        -> Result<Vec<String>>;

    /// History of vector element names for a vector variable
    fn vector_elements(&self, variable: &Variable) -> Result<Vec<VectorElements>>;

    /// Top-level hierarchy groupings
    fn top_level_hierarchies(&self) -> Result<Vec<HierarchyHandle>>;

    /// Direct children of a grouping
    fn child_hierarchies(&self, parent: &HierarchyHandle) -> Result<Vec<HierarchyHandle>>;

    /// Names of variables attached to a grouping
    fn variables_attached_to(&self, handle: &HierarchyHandle) -> Result<Vec<String>>;
}

/// Backend handle of a hierarchy grouping
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyHandle {
    /// Backend identifier, opaque to this crate
    pub id: String,
    /// Raw grouping name
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
}

impl HierarchyHandle {
    /// Create a handle
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Vector element names valid from a given instant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorElements {
    /// Instant from which the names apply
    pub stamp: Instant,
    /// One name per vector element
    pub names: Vec<String>,
}

// =============================================================================
// TimeseriesService Trait
// =============================================================================

/// Sample retrieval
pub trait TimeseriesService: Send + Sync {
    /// Raw samples in `[start, end]`
    fn data_in_window(&self, variable: &Variable, start: Instant, end: Instant)
        -> Result<Dataset>;

    /// Raw samples in `[start, end]` acquired while one of `fundamentals` was active
    fn data_filtered_by_fundamentals(
        &self,
        variable: &Variable,
        start: Instant,
        end: Instant,
        fundamentals: &[String],
    ) -> Result<Dataset>;

    /// One sample per master timestamp, in the master's order
    fn data_aligned_to(&self, variable: &Variable, master: &Dataset) -> Result<Dataset>;

    /// The last sample strictly before `at`, as a one-record dataset
    fn last_before(&self, variable: &Variable, at: Instant) -> Result<Option<Dataset>>;

    /// The first sample strictly after `at`, as a one-record dataset
    fn next_after(&self, variable: &Variable, at: Instant) -> Result<Option<Dataset>>;

    /// One aggregate per variable over `[start, end]`
    fn statistics(
        &self,
        variables: &VariableSet,
        start: Instant,
        end: Instant,
    ) -> Result<Vec<VariableStatistics>>;

    /// Samples reduced into fixed time buckets
    fn data_in_fixed_intervals(
        &self,
        variable: &Variable,
        start: Instant,
        end: Instant,
        scaling: &TimeScaling,
    ) -> Result<Dataset>;
}

/// Aggregate for one variable as reported by the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableStatistics {
    /// Variable name
    pub variable: String,
    /// Number of observations
    pub count: u64,
    /// Earliest observation
    pub min_stamp: Option<Instant>,
    /// Latest observation
    pub max_stamp: Option<Instant>,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean value
    pub avg: f64,
    /// Standard deviation
    pub std_dev: f64,
}

// =============================================================================
// FillService Trait
// =============================================================================

/// Fill and beam-mode timeline
pub trait FillService: Send + Sync {
    /// One fill by number
    fn fill_by_number(&self, fill_number: u32) -> Result<Option<FillRecord>>;

    /// The most recent fill that has ended
    fn last_completed_fill(&self) -> Result<Option<FillRecord>>;

    /// Numbers of fills overlapping `[start, end]`, ascending
    fn fills_in_window(&self, start: Instant, end: Instant) -> Result<Vec<u32>>;

    /// Numbers of fills overlapping `[start, end]` with at least one of `modes`
    fn fills_in_window_with_modes(
        &self,
        start: Instant,
        end: Instant,
        modes: &[BeamModeValue],
    ) -> Result<Vec<u32>>;
}
