//! Timestamp codec
//!
//! Converts the timestamp forms callers pass in (calendar strings, calendar
//! values, fractional epoch seconds, canonical instants) into [`Instant`],
//! and converts instants back into the form the caller asked for.
//!
//! An absent bound stays absent: `encode(None::<f64>)` is `Ok(None)`, never
//! the epoch.
//!
//! Calendar strings and values are interpreted in UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::types::{Instant, TimeValue};

/// Accepted calendar string layouts, most specific first
const CALENDAR_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A timestamp in any of the forms accepted from callers
#[derive(Debug, Clone, PartialEq)]
pub enum TimeInput {
    /// Calendar string, e.g. `2016-08-01 12:00:00.123456789`
    Text(String),
    /// UTC calendar value
    Calendar(DateTime<Utc>),
    /// Calendar value without zone, taken as UTC
    Naive(NaiveDateTime),
    /// Fractional seconds since the epoch
    Epoch(f64),
    /// Already canonical
    Instant(Instant),
    /// No bound
    Unbounded,
}

impl From<&str> for TimeInput {
    fn from(s: &str) -> Self {
        TimeInput::Text(s.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(s: String) -> Self {
        TimeInput::Text(s)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeInput::Calendar(dt)
    }
}

impl From<NaiveDateTime> for TimeInput {
    fn from(dt: NaiveDateTime) -> Self {
        TimeInput::Naive(dt)
    }
}

impl From<f64> for TimeInput {
    fn from(t: f64) -> Self {
        TimeInput::Epoch(t)
    }
}

impl From<i64> for TimeInput {
    fn from(t: i64) -> Self {
        TimeInput::Instant(Instant::new(t, 0))
    }
}

impl From<Instant> for TimeInput {
    fn from(t: Instant) -> Self {
        TimeInput::Instant(t)
    }
}

impl<T: Into<TimeInput>> From<Option<T>> for TimeInput {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(TimeInput::Unbounded)
    }
}

/// Representation requested for instants handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// Fractional epoch seconds
    #[default]
    Unix,
    /// UTC calendar values
    Calendar,
}

impl From<bool> for TimeFormat {
    /// Map the conventional `unixtime` flag
    fn from(unixtime: bool) -> Self {
        if unixtime {
            TimeFormat::Unix
        } else {
            TimeFormat::Calendar
        }
    }
}

/// Convert a caller-supplied timestamp into a canonical instant
///
/// # Errors
///
/// Returns `Error::InvalidArgument` for unparseable strings and for
/// non-finite epoch values.
pub fn encode(value: impl Into<TimeInput>) -> Result<Option<Instant>> {
    match value.into() {
        TimeInput::Unbounded => Ok(None),
        TimeInput::Instant(t) => Ok(Some(t)),
        TimeInput::Epoch(t) => Instant::from_epoch_seconds(t)
            .map(Some)
            .ok_or_else(|| Error::invalid_argument(format!("epoch value {} is not representable", t))),
        TimeInput::Calendar(dt) => Ok(Some(Instant::from_datetime(&dt))),
        TimeInput::Naive(dt) => Ok(Some(Instant::from_datetime(&dt.and_utc()))),
        TimeInput::Text(s) => parse_calendar(&s).map(|dt| Some(Instant::from_datetime(&dt))),
    }
}

/// Convert a required bound, rejecting an absent one
pub fn encode_required(value: impl Into<TimeInput>, what: &str) -> Result<Instant> {
    encode(value)?.ok_or_else(|| Error::invalid_argument(format!("{} must be provided", what)))
}

/// Convert a canonical instant into the caller's representation
pub fn decode(instant: Option<Instant>, format: TimeFormat) -> Option<TimeValue> {
    instant.map(|t| to_time_value(&t, format))
}

/// Convert a present instant into the caller's representation
///
/// Instants outside the calendar range fall back to epoch seconds.
pub fn to_time_value(instant: &Instant, format: TimeFormat) -> TimeValue {
    match format {
        TimeFormat::Unix => TimeValue::Unix(instant.to_epoch_seconds()),
        TimeFormat::Calendar => instant
            .to_datetime()
            .map(TimeValue::Calendar)
            .unwrap_or_else(|| TimeValue::Unix(instant.to_epoch_seconds())),
    }
}

/// Parse a calendar string as UTC
fn parse_calendar(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in CALENDAR_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    Err(Error::invalid_argument(format!(
        "cannot parse timestamp '{}', expected 'YYYY-MM-DD hh:mm:ss[.fffffffff]'",
        s
    )))
}
