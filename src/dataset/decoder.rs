//! Dataset decoder
//!
//! Dispatches on the declared [`DataType`] and then on the [`DataClass`]
//! the dataset actually reports. A recognized tag whose records carry a
//! class the decoder does not handle falls back to passing the raw
//! payloads through unchanged, with a warning.

use serde::Serialize;
use tracing::warn;

use super::{DataClass, Dataset, RawValue, Record};
use crate::timestamp::{to_time_value, TimeFormat};
use crate::types::{DataType, TimeValue};

/// Normalized values of one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Values {
    /// Floating-point scalars
    Float(Vec<f64>),
    /// Integer scalars
    Int(Vec<i64>),
    /// Floating-point vectors
    FloatVector(Vec<Vec<f64>>),
    /// Integer vectors
    IntVector(Vec<Vec<i64>>),
    /// Floating-point matrices
    FloatMatrix(Vec<Vec<Vec<f64>>>),
    /// Integer matrices
    IntMatrix(Vec<Vec<Vec<i64>>>),
    /// Strings
    Text(Vec<String>),
    /// String vectors
    TextVector(Vec<Vec<String>>),
    /// Presence markers, always `true`
    Presence(Vec<bool>),
    /// Undecoded payloads
    Raw(Vec<RawValue>),
}

impl Values {
    /// Number of per-timestamp entries
    pub fn len(&self) -> usize {
        match self {
            Values::Float(v) => v.len(),
            Values::Int(v) => v.len(),
            Values::FloatVector(v) => v.len(),
            Values::IntVector(v) => v.len(),
            Values::FloatMatrix(v) => v.len(),
            Values::IntMatrix(v) => v.len(),
            Values::Text(v) => v.len(),
            Values::TextVector(v) => v.len(),
            Values::Presence(v) => v.len(),
            Values::Raw(v) => v.len(),
        }
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of NaN or infinite entries across all floating-point elements
    ///
    /// Integer, string and presence values never count.
    pub fn non_finite_count(&self) -> usize {
        let bad = |x: &f64| !x.is_finite();
        match self {
            Values::Float(v) => v.iter().filter(|x| bad(x)).count(),
            Values::FloatVector(v) => v.iter().flatten().filter(|x| bad(x)).count(),
            Values::FloatMatrix(v) => v.iter().flatten().flatten().filter(|x| bad(x)).count(),
            _ => 0,
        }
    }
}

/// A decoded `(timestamps, values)` pair of equal length
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    /// Timestamps in ascending order
    pub timestamps: Vec<TimeValue>,
    /// Values, one entry per timestamp
    pub values: Values,
}

impl Series {
    /// The empty series
    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            values: Values::Float(Vec::new()),
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether there are no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamps as fractional epoch seconds
    pub fn epoch_seconds(&self) -> Vec<f64> {
        self.timestamps.iter().map(TimeValue::epoch_seconds).collect()
    }
}

/// Decode a backend dataset into a uniform series
///
/// An empty dataset decodes to an empty series for every tag.
pub fn decode(dataset: &Dataset, datatype: DataType, format: TimeFormat) -> Series {
    let records = dataset.records();
    let class = match dataset.data_class() {
        Some(class) => class,
        None => return Series::empty(),
    };

    let timestamps = records
        .iter()
        .map(|r| to_time_value(&r.stamp, format))
        .collect();

    let values = match (datatype, class) {
        (DataType::Numeric, DataClass::NumericDouble) => extract(records, |v| match v {
            RawValue::Double(x) => Some(*x),
            _ => None,
        })
        .map(Values::Float),
        (DataType::Numeric, DataClass::NumericLong) => extract(records, |v| match v {
            RawValue::Long(x) => Some(*x),
            _ => None,
        })
        .map(Values::Int),
        (DataType::VectorNumeric, DataClass::VectorDouble) => extract(records, |v| match v {
            RawValue::DoubleVector(x) => Some(x.clone()),
            _ => None,
        })
        .map(Values::FloatVector),
        (DataType::VectorNumeric, DataClass::VectorLong) => extract(records, |v| match v {
            RawValue::LongVector(x) => Some(x.clone()),
            _ => None,
        })
        .map(Values::IntVector),
        (DataType::MatrixNumeric, DataClass::MatrixDouble) => extract(records, |v| match v {
            RawValue::DoubleMatrix(x) => Some(x.clone()),
            _ => None,
        })
        .map(Values::FloatMatrix),
        (DataType::MatrixNumeric, DataClass::MatrixLong) => extract(records, |v| match v {
            RawValue::LongMatrix(x) => Some(x.clone()),
            _ => None,
        })
        .map(Values::IntMatrix),
        (DataType::VectorString, DataClass::TextVector) => extract(records, |v| match v {
            RawValue::TextVector(x) => Some(x.clone()),
            _ => None,
        })
        .map(Values::TextVector),
        (DataType::Textual, DataClass::Text) => extract(records, |v| match v {
            RawValue::Text(x) => Some(x.clone()),
            _ => None,
        })
        .map(Values::Text),
        // Fundamentals only mark presence, whatever the payload
        (DataType::Fundamental, _) => Some(Values::Presence(vec![true; records.len()])),
        _ => None,
    };

    let values = values.unwrap_or_else(|| {
        warn!(
            variable = %dataset.variable(),
            datatype = %datatype,
            class = ?class,
            "Unsupported datatype, returning the raw records"
        );
        Values::Raw(records.iter().map(|r| r.value.clone()).collect())
    });

    Series { timestamps, values }
}

/// Pull one payload shape out of every record, `None` on the first mismatch
fn extract<T>(records: &[Record], f: impl Fn(&RawValue) -> Option<T>) -> Option<Vec<T>> {
    records.iter().map(|r| f(&r.value)).collect()
}
