//! Core data types shared across the retrieval layer
//!
//! # Key Types
//!
//! - **`Instant`**: canonical point in time (whole seconds + nanoseconds since the Unix epoch)
//! - **`TimeValue`**: an instant as handed back to callers, epoch seconds or a UTC calendar value
//! - **`DataType`**: declared datatype tag of a logged variable
//! - **`Variable`**: a resolved variable handle with its metadata
//! - **`VariableSet`**: ordered, de-duplicated collection of variables
//!
//! # Example
//!
//! ```rust
//! use timber::types::{DataType, Instant, Variable, VariableSet};
//!
//! let t = Instant::from_epoch_seconds(1_500_000_000.25).unwrap();
//! assert_eq!(t.nanos(), 250_000_000);
//!
//! let mut set = VariableSet::new();
//! set.insert(Variable::new("LHC.BCTDC.A6R4.B1:BEAM_INTENSITY", DataType::Numeric));
//! assert!(!set.insert(Variable::new("LHC.BCTDC.A6R4.B1:BEAM_INTENSITY", DataType::Numeric)));
//! assert_eq!(set.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Canonical point in time with nanosecond precision
///
/// Stored as whole seconds since 1970-01-01 00:00:00 UTC plus a nanosecond
/// component in `[0, 1e9)`. Keeping the two parts separate means the
/// sub-second part survives even when the epoch-seconds float cannot carry
/// nanosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instant {
    secs: i64,
    nanos: u32,
}

impl Instant {
    /// Create an instant, carrying excess nanoseconds into the seconds part
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self {
            secs: secs.saturating_add((nanos / NANOS_PER_SEC) as i64),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// Create an instant from fractional epoch seconds
    ///
    /// Returns `None` for NaN, infinities and values outside the `i64` seconds range.
    pub fn from_epoch_seconds(t: f64) -> Option<Self> {
        if !t.is_finite() || t.abs() >= i64::MAX as f64 {
            return None;
        }
        let whole = t.floor();
        let mut secs = whole as i64;
        let mut nanos = ((t - whole) * 1e9).round() as u32;
        if nanos >= NANOS_PER_SEC {
            secs += 1;
            nanos -= NANOS_PER_SEC;
        }
        Some(Self { secs, nanos })
    }

    /// Create an instant from a UTC calendar value
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self::new(dt.timestamp(), dt.timestamp_subsec_nanos())
    }

    /// The current wall-clock instant
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    /// Whole seconds since the epoch (floored)
    pub fn seconds(&self) -> i64 {
        self.secs
    }

    /// Nanoseconds past the whole second, in `[0, 1e9)`
    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Fractional epoch seconds
    pub fn to_epoch_seconds(&self) -> f64 {
        self.secs as f64 + self.nanos as f64 / 1e9
    }

    /// UTC calendar form, `None` when outside chrono's representable range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, self.nanos)
    }

    /// Shift by a whole number of seconds
    pub fn add_seconds(&self, secs: i64) -> Self {
        Self {
            secs: self.secs.saturating_add(secs),
            nanos: self.nanos,
        }
    }

    /// Signed distance `self - other` in fractional seconds
    pub fn seconds_since(&self, other: &Instant) -> f64 {
        self.secs.saturating_sub(other.secs) as f64
            + (self.nanos as f64 - other.nanos as f64) / 1e9
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.9f")),
            None => write!(f, "{}.{:09}", self.secs, self.nanos),
        }
    }
}

/// An instant in the form requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TimeValue {
    /// Fractional seconds since the Unix epoch
    Unix(f64),
    /// UTC calendar value
    Calendar(DateTime<Utc>),
}

impl TimeValue {
    /// Epoch seconds regardless of the representation
    pub fn epoch_seconds(&self) -> f64 {
        match self {
            TimeValue::Unix(t) => *t,
            TimeValue::Calendar(dt) => Instant::from_datetime(dt).to_epoch_seconds(),
        }
    }

    /// The calendar value, if this is one
    pub fn as_calendar(&self) -> Option<&DateTime<Utc>> {
        match self {
            TimeValue::Calendar(dt) => Some(dt),
            TimeValue::Unix(_) => None,
        }
    }
}

/// Declared datatype tag of a logged variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// Scalar number per timestamp
    Numeric,
    /// 1-D numeric vector per timestamp
    #[serde(rename = "VECTORNUMERIC")]
    VectorNumeric,
    /// 2-D numeric matrix per timestamp
    #[serde(rename = "MATRIXNUMERIC")]
    MatrixNumeric,
    /// 1-D string vector per timestamp
    #[serde(rename = "VECTORSTRING")]
    VectorString,
    /// String per timestamp
    Textual,
    /// Presence marker used for fundamental filtering
    Fundamental,
}

impl DataType {
    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Numeric => "NUMERIC",
            DataType::VectorNumeric => "VECTORNUMERIC",
            DataType::MatrixNumeric => "MATRIXNUMERIC",
            DataType::VectorString => "VECTORSTRING",
            DataType::Textual => "TEXTUAL",
            DataType::Fundamental => "FUNDAMENTAL",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NUMERIC" => Ok(DataType::Numeric),
            "VECTORNUMERIC" => Ok(DataType::VectorNumeric),
            "MATRIXNUMERIC" => Ok(DataType::MatrixNumeric),
            "VECTORSTRING" => Ok(DataType::VectorString),
            "TEXTUAL" => Ok(DataType::Textual),
            "FUNDAMENTAL" => Ok(DataType::Fundamental),
            other => Err(crate::error::Error::invalid_argument(format!(
                "unknown datatype '{}'",
                other
            ))),
        }
    }
}

/// A resolved variable handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Unique variable name
    pub name: String,
    /// Declared datatype
    pub datatype: DataType,
    /// Free-text description
    pub description: Option<String>,
    /// Physical unit
    pub unit: Option<String>,
}

impl Variable {
    /// Create a variable without description or unit
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            description: None,
            unit: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered set of variables, unique by name
///
/// Insertion order is preserved; inserting a name that is already present
/// is a no-op.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    variables: Vec<Variable>,
}

impl VariableSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable, returning `false` if the name was already present
    pub fn insert(&mut self, variable: Variable) -> bool {
        if self.contains(&variable.name) {
            return false;
        }
        self.variables.push(variable);
        true
    }

    /// Whether a variable with this name is present
    pub fn contains(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Look up a variable by name
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Variable at a position in insertion order
    pub fn get_index(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.variables.iter()
    }

    /// Variable names in insertion order
    pub fn names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }
}

impl FromIterator<Variable> for VariableSet {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut set = VariableSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

impl<'a> IntoIterator for &'a VariableSet {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_from_epoch_seconds() {
        let t = Instant::from_epoch_seconds(1000.5).unwrap();
        assert_eq!(t.seconds(), 1000);
        assert_eq!(t.nanos(), 500_000_000);

        // Negative values floor towards minus infinity
        let t = Instant::from_epoch_seconds(-1.25).unwrap();
        assert_eq!(t.seconds(), -2);
        assert_eq!(t.nanos(), 750_000_000);

        assert!(Instant::from_epoch_seconds(f64::NAN).is_none());
        assert!(Instant::from_epoch_seconds(f64::INFINITY).is_none());
    }

    #[test]
    fn test_instant_normalizes_nanos() {
        let t = Instant::new(10, 2_500_000_000);
        assert_eq!(t.seconds(), 12);
        assert_eq!(t.nanos(), 500_000_000);
    }

    #[test]
    fn test_instant_datetime_round_trip() {
        let t = Instant::new(1_500_000_000, 123_456_789);
        let dt = t.to_datetime().unwrap();
        assert_eq!(Instant::from_datetime(&dt), t);
    }

    #[test]
    fn test_extreme_seconds_saturate() {
        let t = Instant::new(i64::MAX, 1_500_000_000);
        assert_eq!(t.seconds(), i64::MAX);
        assert_eq!(t.nanos(), 500_000_000);

        let far = Instant::new(i64::MAX, 0);
        let near = Instant::new(i64::MIN, 0);
        assert!(far.seconds_since(&near).is_finite());
        assert!(far.seconds_since(&near) > 0.0);
        assert!(near.seconds_since(&far) < 0.0);
    }

    #[test]
    fn test_seconds_since() {
        let a = Instant::new(10, 250_000_000);
        let b = Instant::new(8, 750_000_000);
        assert!((a.seconds_since(&b) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_datatype_parse() {
        assert_eq!("vectornumeric".parse::<DataType>().unwrap(), DataType::VectorNumeric);
        assert_eq!(DataType::MatrixNumeric.to_string(), "MATRIXNUMERIC");
        assert!("BLOB".parse::<DataType>().is_err());
    }

    #[test]
    fn test_variable_set_preserves_order_and_uniqueness() {
        let set: VariableSet = ["B", "A", "B", "C"]
            .iter()
            .map(|n| Variable::new(*n, DataType::Numeric))
            .collect();
        assert_eq!(set.names(), vec!["B", "A", "C"]);
        assert_eq!(set.get_index(1).unwrap().name, "A");
        assert!(set.get("D").is_none());
    }
}
