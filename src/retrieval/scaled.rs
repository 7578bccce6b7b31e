//! Fixed-interval scaling
//!
//! A [`TimeScaling`] descriptor (algorithm, interval unit, interval size)
//! asks the backend to reduce samples into fixed time buckets. Buckets
//! start at the window start, are half-open `[b, b + interval)` and carry
//! their start instant as timestamp. MONTH and YEAR buckets step by
//! calendar months from the window start.
//!
//! [`bucketize`] is the reference reduction, used by the in-memory backend.
//! Sparse algorithms only visit buckets that hold samples, so the window
//! length does not bound the work. REPEAT and INTERPOLATE emit empty buckets
//! too and stop after [`MAX_DENSE_BUCKETS`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Months};
use tracing::{error, info, warn};

use crate::dataset::{decode, Series};
use crate::engine::TimeseriesService;
use crate::error::{Result, ScalingError};
use crate::resolver::{Selection, VariableResolver};
use crate::timestamp::TimeFormat;
use crate::types::Instant;

/// Bucket reduction algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleAlgorithm {
    /// Largest value in the bucket
    Max,
    /// Smallest value in the bucket
    Min,
    /// Mean of the bucket
    Avg,
    /// Number of samples in the bucket
    Count,
    /// Sum of the bucket
    Sum,
    /// Last known value, carried into empty buckets
    Repeat,
    /// Linear interpolation at the bucket start
    Interpolate,
}

/// Most buckets REPEAT or INTERPOLATE will produce for one variable
pub const MAX_DENSE_BUCKETS: u64 = 1_000_000;

impl ScaleAlgorithm {
    /// Every algorithm, in documentation order
    pub const ALL: [ScaleAlgorithm; 7] = [
        ScaleAlgorithm::Max,
        ScaleAlgorithm::Min,
        ScaleAlgorithm::Avg,
        ScaleAlgorithm::Count,
        ScaleAlgorithm::Sum,
        ScaleAlgorithm::Repeat,
        ScaleAlgorithm::Interpolate,
    ];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleAlgorithm::Max => "MAX",
            ScaleAlgorithm::Min => "MIN",
            ScaleAlgorithm::Avg => "AVG",
            ScaleAlgorithm::Count => "COUNT",
            ScaleAlgorithm::Sum => "SUM",
            ScaleAlgorithm::Repeat => "REPEAT",
            ScaleAlgorithm::Interpolate => "INTERPOLATE",
        }
    }

    /// Whether buckets without samples can still produce a value
    pub fn is_dense(&self) -> bool {
        matches!(self, ScaleAlgorithm::Repeat | ScaleAlgorithm::Interpolate)
    }
}

impl FromStr for ScaleAlgorithm {
    type Err = ScalingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ScaleAlgorithm::ALL
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScalingError::UnknownAlgorithm(s.to_string()))
    }
}

/// Bucket interval unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleInterval {
    /// One second
    Second,
    /// 60 seconds
    Minute,
    /// 3600 seconds
    Hour,
    /// 86400 seconds
    Day,
    /// 7 days
    Week,
    /// One calendar month
    Month,
    /// Twelve calendar months
    Year,
}

impl ScaleInterval {
    /// Every unit, in documentation order
    pub const ALL: [ScaleInterval; 7] = [
        ScaleInterval::Second,
        ScaleInterval::Minute,
        ScaleInterval::Hour,
        ScaleInterval::Day,
        ScaleInterval::Week,
        ScaleInterval::Month,
        ScaleInterval::Year,
    ];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleInterval::Second => "SECOND",
            ScaleInterval::Minute => "MINUTE",
            ScaleInterval::Hour => "HOUR",
            ScaleInterval::Day => "DAY",
            ScaleInterval::Week => "WEEK",
            ScaleInterval::Month => "MONTH",
            ScaleInterval::Year => "YEAR",
        }
    }

    /// Length in seconds for fixed-length units
    fn fixed_seconds(&self) -> Option<i64> {
        match self {
            ScaleInterval::Second => Some(1),
            ScaleInterval::Minute => Some(60),
            ScaleInterval::Hour => Some(3_600),
            ScaleInterval::Day => Some(86_400),
            ScaleInterval::Week => Some(7 * 86_400),
            ScaleInterval::Month | ScaleInterval::Year => None,
        }
    }

    /// Length in calendar months for calendar units
    fn months(&self) -> Option<u32> {
        match self {
            ScaleInterval::Month => Some(1),
            ScaleInterval::Year => Some(12),
            _ => None,
        }
    }
}

impl FromStr for ScaleInterval {
    type Err = ScalingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ScaleInterval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScalingError::UnknownInterval(s.to_string()))
    }
}

/// Scaling descriptor: `size` × `interval`, reduced with `algorithm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeScaling {
    /// Reduction
    pub algorithm: ScaleAlgorithm,
    /// Interval unit
    pub interval: ScaleInterval,
    /// Number of units per bucket, at least 1
    pub size: u32,
}

impl TimeScaling {
    /// Create a descriptor, rejecting a zero size
    pub fn new(
        algorithm: ScaleAlgorithm,
        interval: ScaleInterval,
        size: u32,
    ) -> std::result::Result<Self, ScalingError> {
        if size == 0 {
            return Err(ScalingError::InvalidSize(size.to_string()));
        }
        Ok(Self {
            algorithm,
            interval,
            size,
        })
    }

    /// Build a descriptor from its textual parts, e.g. `("1", "MINUTE", "SUM")`
    pub fn parse(
        size: &str,
        interval: &str,
        algorithm: &str,
    ) -> std::result::Result<Self, ScalingError> {
        let size_value = size
            .trim()
            .parse::<u32>()
            .map_err(|_| ScalingError::InvalidSize(size.to_string()))?;
        Self::new(algorithm.parse()?, interval.parse()?, size_value)
    }

    /// Start of bucket `index` for a window starting at `origin`
    pub fn bucket_start(&self, origin: Instant, index: u32) -> Option<Instant> {
        if let Some(secs) = self.interval.fixed_seconds() {
            let offset = secs.checked_mul(self.size as i64)?.checked_mul(index as i64)?;
            return Some(origin.add_seconds(offset));
        }
        let months = self.interval.months()?.checked_mul(self.size)?.checked_mul(index)?;
        let shifted = origin.to_datetime()?.checked_add_months(Months::new(months))?;
        Some(Instant::from_datetime(&shifted))
    }

    /// Index of the bucket containing `t` for a window starting at `origin`
    ///
    /// `None` before `origin` or past the last addressable bucket.
    pub fn bucket_index(&self, origin: Instant, t: Instant) -> Option<u32> {
        if t < origin {
            return None;
        }
        if let Some(secs) = self.interval.fixed_seconds() {
            let width = i128::from(secs) * i128::from(self.size) * 1_000_000_000;
            let elapsed = (i128::from(t.seconds()) - i128::from(origin.seconds())) * 1_000_000_000
                + i128::from(t.nanos())
                - i128::from(origin.nanos());
            return u32::try_from(elapsed / width).ok();
        }

        let step = i64::from(self.interval.months()?) * i64::from(self.size);
        let (from, to) = (origin.to_datetime()?, t.to_datetime()?);
        let months = i64::from(to.year() - from.year()) * 12 + i64::from(to.month())
            - i64::from(from.month());
        let mut index = u32::try_from(months.max(0) / step).ok()?;
        // Day-of-month clamping can leave the estimate one bucket off
        while index > 0 && self.bucket_start(origin, index).map_or(true, |b| b > t) {
            index -= 1;
        }
        while index
            .checked_add(1)
            .and_then(|next| self.bucket_start(origin, next))
            .map_or(false, |b| b <= t)
        {
            index += 1;
        }
        Some(index)
    }

    /// Number of buckets beginning inside `[start, end]`
    pub fn bucket_count(&self, start: Instant, end: Instant) -> u64 {
        if end < start {
            return 0;
        }
        match self.bucket_index(start, end) {
            Some(last) => u64::from(last) + 1,
            None => u64::from(u32::MAX) + 1,
        }
    }
}

impl fmt::Display for TimeScaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.size,
            self.interval.as_str(),
            self.algorithm.as_str()
        )
    }
}

/// Reduce time-ordered samples into the buckets of `scaling` over `[start, end]`
///
/// MAX, MIN, AVG, COUNT and SUM emit only non-empty buckets. REPEAT emits
/// every bucket from the first one that has a known value. INTERPOLATE
/// emits buckets whose start lies between two samples (or on one).
pub fn bucketize(
    samples: &[(Instant, f64)],
    start: Instant,
    end: Instant,
    scaling: &TimeScaling,
) -> Vec<(Instant, f64)> {
    let window: Vec<(Instant, f64)> = samples
        .iter()
        .filter(|(t, _)| *t >= start && *t <= end)
        .copied()
        .collect();

    let reduce: fn(&[f64]) -> f64 = match scaling.algorithm {
        ScaleAlgorithm::Max => |v| v.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
        ScaleAlgorithm::Min => |v| v.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
        ScaleAlgorithm::Sum => |v| v.iter().sum::<f64>(),
        ScaleAlgorithm::Avg => |v| v.iter().sum::<f64>() / v.len() as f64,
        ScaleAlgorithm::Count => |v| v.len() as f64,
        ScaleAlgorithm::Repeat | ScaleAlgorithm::Interpolate => {
            return fill_dense(&window, start, end, scaling)
        }
    };

    let mut out = Vec::new();
    let mut lo = 0;
    while lo < window.len() {
        let index = match scaling.bucket_index(start, window[lo].0) {
            Some(index) => index,
            None => break,
        };
        let bucket = match scaling.bucket_start(start, index) {
            Some(bucket) => bucket,
            None => break,
        };
        let mut hi = lo + 1;
        while hi < window.len() && scaling.bucket_index(start, window[hi].0) == Some(index) {
            hi += 1;
        }
        let values: Vec<f64> = window[lo..hi].iter().map(|(_, v)| *v).collect();
        out.push((bucket, reduce(&values)));
        lo = hi;
    }
    out
}

/// REPEAT and INTERPOLATE, walking buckets from the first sample's bucket
fn fill_dense(
    window: &[(Instant, f64)],
    start: Instant,
    end: Instant,
    scaling: &TimeScaling,
) -> Vec<(Instant, f64)> {
    let (first, last) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return Vec::new(),
    };
    let from = match scaling.bucket_index(start, first) {
        Some(from) => from,
        None => return Vec::new(),
    };
    // Nothing to interpolate at a bucket starting after the last sample
    let bound = match scaling.algorithm {
        ScaleAlgorithm::Interpolate => last,
        _ => end,
    };
    let to = scaling.bucket_index(start, bound).unwrap_or(u32::MAX);

    let mut out = Vec::new();
    let mut cursor = 0;
    for index in (from..=to).take(MAX_DENSE_BUCKETS as usize) {
        let bucket = match scaling.bucket_start(start, index) {
            Some(bucket) if bucket <= end => bucket,
            _ => break,
        };
        let value = match scaling.algorithm {
            ScaleAlgorithm::Interpolate => interpolate(window, bucket),
            _ => {
                let next = index
                    .checked_add(1)
                    .and_then(|i| scaling.bucket_start(start, i));
                while cursor < window.len() && next.map_or(true, |n| window[cursor].0 < n) {
                    cursor += 1;
                }
                cursor.checked_sub(1).map(|i| window[i].1)
            }
        };
        if let Some(v) = value {
            out.push((bucket, v));
        }
    }
    out
}

/// Linear interpolation of time-ordered samples at `at`
fn interpolate(samples: &[(Instant, f64)], at: Instant) -> Option<f64> {
    let after = samples.partition_point(|(t, _)| *t < at);
    let (t1, v1) = *samples.get(after)?;
    if t1 == at {
        return Some(v1);
    }
    let (t0, v0) = *samples.get(after.checked_sub(1)?)?;
    let span = t1.seconds_since(&t0);
    Some(v0 + (v1 - v0) * at.seconds_since(&t0) / span)
}

/// Retrieves every resolved variable bucketed with one scaling descriptor
pub struct ScalingEngine {
    resolver: VariableResolver,
    timeseries: Arc<dyn TimeseriesService>,
}

impl ScalingEngine {
    /// Create an engine
    pub fn new(resolver: VariableResolver, timeseries: Arc<dyn TimeseriesService>) -> Self {
        Self {
            resolver,
            timeseries,
        }
    }

    /// Scaled series per variable
    ///
    /// Series containing NaN or infinite values are kept and reported with
    /// a warning.
    ///
    /// # Errors
    ///
    /// A backend rejection of the descriptor fails the whole call.
    pub fn get_scaled(
        &self,
        selection: &Selection,
        start: Instant,
        end: Instant,
        scaling: &TimeScaling,
        format: TimeFormat,
    ) -> Result<BTreeMap<String, Series>> {
        let variables = self.resolver.resolve(selection)?.variables;
        if variables.is_empty() {
            warn!("No variables found.");
            return Ok(BTreeMap::new());
        }
        info!(
            variables = %variables.names().join(", "),
            scaling = %scaling,
            "List of variables to be queried"
        );

        let mut out = BTreeMap::new();
        for variable in &variables {
            let dataset = self
                .timeseries
                .data_in_fixed_intervals(variable, start, end, scaling)
                .map_err(|e| {
                    error!(
                        variable = %variable.name,
                        scaling = %scaling,
                        error = %e,
                        algorithms = ?ScaleAlgorithm::ALL.map(|a| a.as_str()),
                        intervals = ?ScaleInterval::ALL.map(|i| i.as_str()),
                        "Scaled retrieval failed; size must be a positive integer"
                    );
                    e
                })?;
            info!(variable = %variable.name, count = dataset.len(), "Retrieved values");

            let series = decode(&dataset, dataset.datatype(), format);
            let bad = series.values.non_finite_count();
            if bad > 0 {
                warn!(variable = %variable.name, count = bad, "Variable contains NaN values");
            }
            out.insert(variable.name.clone(), series);
        }
        Ok(out)
    }
}
