//! Window statistics per variable

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::{TimeseriesService, VariableStatistics};
use crate::error::Result;
use crate::resolver::{Selection, VariableResolver};
use crate::timestamp::{decode, TimeFormat};
use crate::types::{Instant, TimeValue};

/// Summary statistics of one variable over a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    /// Earliest observation
    pub min_stamp: Option<TimeValue>,
    /// Latest observation
    pub max_stamp: Option<TimeValue>,
    /// Number of observations, always positive
    pub count: u64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean value
    pub avg: f64,
    /// Standard deviation
    pub std_dev: f64,
}

impl Stat {
    /// Convert a backend aggregate, `None` when it has no observations
    pub fn from_backend(raw: &VariableStatistics, format: TimeFormat) -> Option<Self> {
        if raw.count == 0 {
            return None;
        }
        Some(Self {
            min_stamp: decode(raw.min_stamp, format),
            max_stamp: decode(raw.max_stamp, format),
            count: raw.count,
            min: raw.min,
            max: raw.max,
            avg: raw.avg,
            std_dev: raw.std_dev,
        })
    }
}

/// Issues one aggregate query for a whole selection
pub struct StatisticsAggregator {
    resolver: VariableResolver,
    timeseries: Arc<dyn TimeseriesService>,
}

impl StatisticsAggregator {
    /// Create an aggregator
    pub fn new(resolver: VariableResolver, timeseries: Arc<dyn TimeseriesService>) -> Self {
        Self {
            resolver,
            timeseries,
        }
    }

    /// Statistics per variable; variables without observations are omitted
    pub fn get_stats(
        &self,
        selection: &Selection,
        start: Instant,
        end: Instant,
        format: TimeFormat,
    ) -> Result<BTreeMap<String, Stat>> {
        let variables = self.resolver.resolve(selection)?.variables;
        if variables.is_empty() {
            warn!("No variables found.");
            return Ok(BTreeMap::new());
        }
        info!(variables = %variables.names().join(", "), "List of variables to be queried");

        let mut out = BTreeMap::new();
        for raw in self.timeseries.statistics(&variables, start, end)? {
            match Stat::from_backend(&raw, format) {
                Some(stat) => {
                    out.insert(raw.variable.clone(), stat);
                }
                None => debug!(variable = %raw.variable, "No observations in window"),
            }
        }
        Ok(out)
    }
}
