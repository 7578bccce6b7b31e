//! Raw window retrieval and nearest-point lookups

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::find_fundamentals;
use crate::dataset::{decode, Series};
use crate::engine::Services;
use crate::error::{Error, Result};
use crate::resolver::{Selection, VariableResolver};
use crate::timestamp::{TimeFormat, TimeInput};
use crate::types::{Instant, Variable};

/// Upper bound of a caller request
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Upper {
    /// The last sample before the lower bound
    #[default]
    Last,
    /// The first sample after the lower bound
    Next,
    /// A closed window ending here
    At(TimeInput),
}

impl From<TimeInput> for Upper {
    fn from(t: TimeInput) -> Self {
        match t {
            TimeInput::Unbounded => Upper::Last,
            other => Upper::At(other),
        }
    }
}

macro_rules! upper_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Upper {
                fn from(t: $ty) -> Self {
                    Upper::from(TimeInput::from(t))
                }
            }
        )*
    };
}

upper_from!(&str, String, f64, i64, Instant, chrono::DateTime<chrono::Utc>);

/// Resolved retrieval window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Last sample strictly before the instant
    LastBefore(Instant),
    /// First sample strictly after the instant
    NextAfter(Instant),
    /// Every sample in the closed range
    Between(Instant, Instant),
}

/// Retrieves raw samples per variable
pub struct PointRetriever {
    resolver: VariableResolver,
    services: Services,
}

impl PointRetriever {
    /// Create a retriever
    pub fn new(resolver: VariableResolver, services: Services) -> Self {
        Self { resolver, services }
    }

    /// Raw series per variable
    ///
    /// A nearest-point lookup that finds nothing yields an empty series for
    /// that variable. No fundamental in the window yields an empty map.
    ///
    /// # Errors
    ///
    /// A fundamental filter needs a closed window; `LastBefore` and
    /// `NextAfter` with a filter are rejected with `Error::InvalidArgument`.
    pub fn get(
        &self,
        selection: &Selection,
        window: Window,
        fundamental: Option<&str>,
        format: TimeFormat,
    ) -> Result<BTreeMap<String, Series>> {
        let variables = self.resolver.resolve(selection)?.variables;
        if variables.is_empty() {
            warn!("No variables found.");
            return Ok(BTreeMap::new());
        }
        info!(variables = %variables.names().join(", "), "List of variables to be queried");

        let fundamentals = match (fundamental, window) {
            (None, _) => None,
            (Some(pattern), Window::Between(start, end)) => {
                let found = find_fundamentals(self.services.meta.as_ref(), start, end, pattern)?;
                if found.is_empty() {
                    return Ok(BTreeMap::new());
                }
                Some(found)
            }
            (Some(_), _) => {
                return Err(Error::invalid_argument(
                    "filtering by fundamentals requires a closed time window",
                ))
            }
        };

        let mut out = BTreeMap::new();
        for variable in &variables {
            let series = self.fetch(variable, window, fundamentals.as_deref(), format)?;
            out.insert(variable.name.clone(), series);
        }
        Ok(out)
    }

    fn fetch(
        &self,
        variable: &Variable,
        window: Window,
        fundamentals: Option<&[String]>,
        format: TimeFormat,
    ) -> Result<Series> {
        let ts = &self.services.timeseries;
        let dataset = match window {
            Window::LastBefore(at) => ts.last_before(variable, at)?,
            Window::NextAfter(at) => ts.next_after(variable, at)?,
            Window::Between(start, end) => Some(match fundamentals {
                Some(f) => ts.data_filtered_by_fundamentals(variable, start, end, f)?,
                None => ts.data_in_window(variable, start, end)?,
            }),
        };

        match dataset {
            Some(ds) => {
                info!(variable = %variable.name, count = ds.len(), "Retrieved values");
                Ok(decode(&ds, ds.datatype(), format))
            }
            None => Ok(Series::empty()),
        }
    }
}
