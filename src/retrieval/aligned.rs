//! Master-aligned multi-variable retrieval
//!
//! The master variable's raw window fixes the timestamp basis. Every other
//! resolved variable is then requested aligned to exactly those
//! timestamps, so all value sequences in the result share one length.
//!
//! Master selection order: the explicit `master` argument, else the first
//! name of an explicit list, else the first variable the pattern resolved
//! to (backend discovery order).

use std::collections::BTreeMap;
use std::time::Instant as Clock;

use serde::Serialize;
use tracing::{info, warn};

use super::find_fundamentals;
use crate::dataset::{decode, Values};
use crate::engine::Services;
use crate::error::{Error, Result};
use crate::resolver::{Selection, VariableResolver};
use crate::timestamp::TimeFormat;
use crate::types::{Instant, TimeValue};

/// Aligned retrieval result
///
/// The default value is the empty result returned when nothing could be
/// aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignedData {
    /// Name of the master variable
    pub master: String,
    /// Master timestamps, shared by every entry of `values`
    pub timestamps: Vec<TimeValue>,
    /// Values per variable, master included
    pub values: BTreeMap<String, Values>,
}

impl AlignedData {
    /// Whether nothing was retrieved
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of one variable
    pub fn get(&self, name: &str) -> Option<&Values> {
        self.values.get(name)
    }

    /// Values of the master variable
    pub fn master_values(&self) -> Option<&Values> {
        self.values.get(&self.master)
    }
}

/// Orchestrates master selection and aligned retrieval
pub struct AlignmentEngine {
    resolver: VariableResolver,
    services: Services,
}

impl AlignmentEngine {
    /// Create an engine
    pub fn new(resolver: VariableResolver, services: Services) -> Self {
        Self { resolver, services }
    }

    /// Retrieve every resolved variable aligned to the master's timestamps
    ///
    /// Returns the empty result, with a warning, when no variable resolves,
    /// when no fundamental matches the filter, or when the master cannot be
    /// found.
    ///
    /// # Errors
    ///
    /// `Error::Backend` when a secondary dataset does not match the
    /// master's sample count.
    pub fn get_aligned(
        &self,
        selection: &Selection,
        start: Instant,
        end: Instant,
        fundamental: Option<&str>,
        master: Option<&str>,
        format: TimeFormat,
    ) -> Result<AlignedData> {
        let variables = self.resolver.resolve(selection)?.variables;
        if variables.is_empty() {
            warn!("No variables found.");
            return Ok(AlignedData::default());
        }

        let fundamentals = match fundamental {
            Some(pattern) => {
                let found = find_fundamentals(self.services.meta.as_ref(), start, end, pattern)?;
                if found.is_empty() {
                    return Ok(AlignedData::default());
                }
                Some(found)
            }
            None => None,
        };

        let master_name = master
            .or_else(|| selection.first_name())
            .or_else(|| variables.get_index(0).map(|v| v.name.as_str()));
        let master_variable = match master_name.and_then(|name| variables.get(name)) {
            Some(v) => v.clone(),
            None => {
                warn!(master = ?master_name, "Master variable not found.");
                return Ok(AlignedData::default());
            }
        };

        let listed: Vec<String> = variables
            .iter()
            .map(|v| {
                if v.name == master_variable.name {
                    format!("{} (master)", v.name)
                } else {
                    v.name.clone()
                }
            })
            .collect();
        info!(variables = %listed.join(", "), "List of variables to be queried");

        let ts = &self.services.timeseries;
        let master_ds = match &fundamentals {
            Some(f) => ts.data_filtered_by_fundamentals(&master_variable, start, end, f)?,
            None => ts.data_in_window(&master_variable, start, end)?,
        };
        info!(
            variable = %master_variable.name,
            count = master_ds.len(),
            "Retrieved values (master)"
        );

        let master_series = decode(&master_ds, master_ds.datatype(), format);
        let expected = master_series.len();

        let mut out = AlignedData {
            master: master_variable.name.clone(),
            timestamps: master_series.timestamps,
            values: BTreeMap::new(),
        };
        out.values.insert(master_variable.name.clone(), master_series.values);

        for variable in variables.iter().filter(|v| v.name != master_variable.name) {
            let started = Clock::now();
            let aligned = ts.data_aligned_to(variable, &master_ds)?;
            info!(
                variable = %variable.name,
                count = aligned.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Retrieved aligned values"
            );

            if aligned.len() != expected {
                return Err(Error::backend(format!(
                    "aligned dataset for {} has {} samples, master {} has {}",
                    variable.name,
                    aligned.len(),
                    master_variable.name,
                    expected
                )));
            }

            let series = decode(&aligned, aligned.datatype(), format);
            out.values.insert(variable.name.clone(), series.values);
        }

        Ok(out)
    }
}
