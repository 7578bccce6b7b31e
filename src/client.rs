//! Client facade over the retrieval engines
//!
//! ```text
//!             ┌────────────── LoggingDb ──────────────┐
//!  caller ──► │ resolve ─► point / aligned / stats /  │ ──► Services
//!             │            scaled / fills / tree      │     (meta, timeseries, fills)
//!             └───────────────────────────────────────┘
//! ```
//!
//! Every operation takes caller time inputs, converts them once, and hands
//! canonical instants to the engine for its retrieval mode.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::dataset::Series;
use crate::engine::{FillService, MetaService, Services, TimeseriesService};
use crate::error::{Error, Result};
use crate::fill::{Fill, FillTimeline, ModeInterval, ModeSelector};
use crate::hierarchy::Hierarchy;
use crate::resolver::{Selection, VariableResolver};
use crate::retrieval::{
    AlignedData, AlignmentEngine, PointRetriever, ScalingEngine, Stat, StatisticsAggregator,
    TimeScaling, Upper, Window,
};
use crate::timestamp::{encode, encode_required, TimeFormat, TimeInput};
use crate::types::{Instant, VariableSet};

/// Vector element naming history of one variable
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VectorMetadata {
    /// Epoch seconds from which each naming applies
    pub timestamps: Vec<f64>,
    /// Element names, one list per timestamp
    pub names: Vec<Vec<String>>,
}

/// Entry point for retrieval from the logging service
pub struct LoggingDb {
    config: Config,
    services: Services,
    resolver: VariableResolver,
    point: PointRetriever,
    aligned: AlignmentEngine,
    stats: StatisticsAggregator,
    scaled: ScalingEngine,
    fills: FillTimeline,
    tree: Arc<Hierarchy>,
}

impl LoggingDb {
    /// Create a client over explicit service handles
    ///
    /// # Errors
    ///
    /// `Error::Configuration` when the configuration does not validate.
    pub fn new(services: Services, config: Config) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;

        if config.client.uses_default_ids() {
            debug!(
                properties_file = %config.client.properties_file.display(),
                "Default appid and clientid selected, this can result in poor performance. \
                 Set different appid/client values or provide a properties file to suppress this message."
            );
        }
        info!(
            app_id = %config.client.app_id,
            client_id = %config.client.client_id,
            source = %config.client.source,
            "Logging client ready"
        );

        let resolver = VariableResolver::new(services.meta.clone());
        Ok(Self {
            point: PointRetriever::new(resolver.clone(), services.clone()),
            aligned: AlignmentEngine::new(resolver.clone(), services.clone()),
            stats: StatisticsAggregator::new(resolver.clone(), services.timeseries.clone()),
            scaled: ScalingEngine::new(resolver.clone(), services.timeseries.clone()),
            fills: FillTimeline::new(services.fills.clone()),
            tree: Hierarchy::root(services.meta.clone()),
            resolver,
            services,
            config,
        })
    }

    /// Create a client over one object implementing every service
    pub fn with_backend<B>(backend: Arc<B>, config: Config) -> Result<Self>
    where
        B: MetaService + TimeseriesService + FillService + 'static,
    {
        Self::new(Services::from_backend(backend), config)
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configured default timestamp format
    pub fn time_format(&self) -> TimeFormat {
        self.config.time_format()
    }

    /// Root of the grouping tree
    pub fn tree(&self) -> Arc<Hierarchy> {
        self.tree.clone()
    }

    /// Variables matching a selection
    pub fn get_variables(&self, selection: impl Into<Selection>) -> Result<VariableSet> {
        Ok(self.resolver.resolve(&selection.into())?.variables)
    }

    /// Names of variables matching a `%` pattern
    pub fn search(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self.get_variables(pattern)?.names())
    }

    /// Description per variable matching a pattern
    pub fn get_description(&self, pattern: &str) -> Result<BTreeMap<String, Option<String>>> {
        Ok(self
            .get_variables(pattern)?
            .iter()
            .map(|v| (v.name.clone(), v.description.clone()))
            .collect())
    }

    /// Unit per variable matching a pattern
    pub fn get_unit(&self, pattern: &str) -> Result<BTreeMap<String, Option<String>>> {
        Ok(self
            .get_variables(pattern)?
            .iter()
            .map(|v| (v.name.clone(), v.unit.clone()))
            .collect())
    }

    /// Fundamentals matching a pattern in `[t1, t2]`; an absent `t2` means now
    pub fn search_fundamental(
        &self,
        pattern: &str,
        t1: impl Into<TimeInput>,
        t2: impl Into<TimeInput>,
    ) -> Result<Vec<String>> {
        let start = encode_required(t1, "t1")?;
        let end = encode(t2)?.unwrap_or_else(Instant::now);
        self.services.meta.fundamentals_like(start, end, pattern)
    }

    /// Raw series per variable
    ///
    /// With `Upper::Last` or `Upper::Next` only the single nearest sample
    /// before or after `t1` is returned.
    pub fn get(
        &self,
        selection: impl Into<Selection>,
        t1: impl Into<TimeInput>,
        upper: impl Into<Upper>,
        fundamental: Option<&str>,
        format: TimeFormat,
    ) -> Result<BTreeMap<String, Series>> {
        let start = encode_required(t1, "t1")?;
        let window = match upper.into() {
            Upper::Last => Window::LastBefore(start),
            Upper::Next => Window::NextAfter(start),
            Upper::At(t2) => match encode(t2)? {
                Some(end) => Window::Between(start, end),
                None => Window::LastBefore(start),
            },
        };
        self.point.get(&selection.into(), window, fundamental, format)
    }

    /// Every variable aligned to the master's timestamps
    pub fn get_aligned(
        &self,
        selection: impl Into<Selection>,
        t1: impl Into<TimeInput>,
        t2: impl Into<TimeInput>,
        fundamental: Option<&str>,
        master: Option<&str>,
        format: TimeFormat,
    ) -> Result<AlignedData> {
        let (start, end) = window(t1, t2)?;
        self.aligned
            .get_aligned(&selection.into(), start, end, fundamental, master, format)
    }

    /// Window statistics per variable
    pub fn get_stats(
        &self,
        selection: impl Into<Selection>,
        t1: impl Into<TimeInput>,
        t2: impl Into<TimeInput>,
        format: TimeFormat,
    ) -> Result<BTreeMap<String, Stat>> {
        let (start, end) = window(t1, t2)?;
        self.stats.get_stats(&selection.into(), start, end, format)
    }

    /// Fixed-interval series per variable
    pub fn get_scaled(
        &self,
        selection: impl Into<Selection>,
        t1: impl Into<TimeInput>,
        t2: impl Into<TimeInput>,
        scaling: &TimeScaling,
        format: TimeFormat,
    ) -> Result<BTreeMap<String, Series>> {
        let (start, end) = window(t1, t2)?;
        self.scaled
            .get_scaled(&selection.into(), start, end, scaling, format)
    }

    /// One fill, or the last completed fill when `fill_number` is `None`
    pub fn get_lhc_fill_data(
        &self,
        fill_number: Option<u32>,
        format: TimeFormat,
    ) -> Result<Option<Fill>> {
        self.fills.get_lhc_fill_data(fill_number, format)
    }

    /// Fills overlapping `[t1, t2]`, optionally filtered by beam mode
    pub fn get_lhc_fills_by_time<S: AsRef<str>>(
        &self,
        t1: impl Into<TimeInput>,
        t2: impl Into<TimeInput>,
        beam_modes: Option<&[S]>,
        format: TimeFormat,
    ) -> Result<Vec<Fill>> {
        let (start, end) = window(t1, t2)?;
        self.fills
            .get_lhc_fills_by_time(start, end, beam_modes, format)
    }

    /// Per fill, the selected instants of two beam modes
    pub fn get_intervals_by_lhc_modes(
        &self,
        t1: impl Into<TimeInput>,
        t2: impl Into<TimeInput>,
        mode1: ModeSelector,
        mode2: ModeSelector,
        format: TimeFormat,
    ) -> Result<Vec<ModeInterval>> {
        let (start, end) = window(t1, t2)?;
        self.fills
            .get_intervals_by_lhc_modes(start, end, mode1, mode2, format)
    }

    /// Vector element naming history per variable
    pub fn get_meta_data(
        &self,
        selection: impl Into<Selection>,
    ) -> Result<BTreeMap<String, VectorMetadata>> {
        let variables = self.get_variables(selection)?;
        let mut out = BTreeMap::new();
        for variable in &variables {
            let history = self.services.meta.vector_elements(variable)?;
            let meta = VectorMetadata {
                timestamps: history.iter().map(|e| e.stamp.to_epoch_seconds()).collect(),
                names: history.into_iter().map(|e| e.names).collect(),
            };
            out.insert(variable.name.clone(), meta);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for LoggingDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingDb")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Convert a closed window; both bounds are required
fn window(t1: impl Into<TimeInput>, t2: impl Into<TimeInput>) -> Result<(Instant, Instant)> {
    Ok((encode_required(t1, "t1")?, encode_required(t2, "t2")?))
}
