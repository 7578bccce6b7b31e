//! Backend result sets and their normalization
//!
//! A [`Dataset`] is what the backend hands back for one variable: a list of
//! time-stamped raw records whose concrete payload type is only known at
//! runtime. The [`decoder`] turns it into a uniform [`Series`].
//!
//! ```text
//!   backend query
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset  │  Vec<Record { stamp, RawValue }>, declared DataType
//!   └──────────┘
//!        │  data_class() resolved once
//!        ▼
//!   ┌──────────┐
//!   │ decoder  │  (DataType, DataClass) → Values
//!   └──────────┘
//!        │
//!        ▼
//!   Series { timestamps, values }
//! ```

pub mod decoder;

pub use decoder::{decode, Series, Values};

use serde::Serialize;

use crate::types::{DataType, Instant};

/// Payload of one backend record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RawValue {
    /// Floating-point scalar
    Double(f64),
    /// Integer scalar
    Long(i64),
    /// Floating-point vector
    DoubleVector(Vec<f64>),
    /// Integer vector
    LongVector(Vec<i64>),
    /// Floating-point matrix (row major)
    DoubleMatrix(Vec<Vec<f64>>),
    /// Integer matrix (row major)
    LongMatrix(Vec<Vec<i64>>),
    /// String
    Text(String),
    /// String vector
    TextVector(Vec<String>),
    /// Presence marker, carries no value
    Marker,
    /// Payload this crate does not understand
    Other(serde_json::Value),
}

impl RawValue {
    /// Storage class of this payload
    pub fn class(&self) -> DataClass {
        match self {
            RawValue::Double(_) => DataClass::NumericDouble,
            RawValue::Long(_) => DataClass::NumericLong,
            RawValue::DoubleVector(_) => DataClass::VectorDouble,
            RawValue::LongVector(_) => DataClass::VectorLong,
            RawValue::DoubleMatrix(_) => DataClass::MatrixDouble,
            RawValue::LongMatrix(_) => DataClass::MatrixLong,
            RawValue::Text(_) => DataClass::Text,
            RawValue::TextVector(_) => DataClass::TextVector,
            RawValue::Marker => DataClass::Marker,
            RawValue::Other(_) => DataClass::Unknown,
        }
    }

    /// Scalar numeric view of the payload
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Double(v) => Some(*v),
            RawValue::Long(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Concrete storage class reported by a dataset
///
/// This is the integer/floating subtype decision, made per dataset rather
/// than per variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    /// Floating-point scalars
    NumericDouble,
    /// Integer scalars
    NumericLong,
    /// Floating-point vectors
    VectorDouble,
    /// Integer vectors
    VectorLong,
    /// Floating-point matrices
    MatrixDouble,
    /// Integer matrices
    MatrixLong,
    /// Strings
    Text,
    /// String vectors
    TextVector,
    /// Presence markers
    Marker,
    /// Unrecognized or heterogeneous payloads
    Unknown,
}

/// One time-stamped backend record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Acquisition instant
    pub stamp: Instant,
    /// Raw payload
    pub value: RawValue,
}

impl Record {
    /// Create a record
    pub fn new(stamp: Instant, value: RawValue) -> Self {
        Self { stamp, value }
    }
}

/// Result set for a single variable, as returned by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    variable: String,
    datatype: DataType,
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset; records are expected in ascending timestamp order
    pub fn new(variable: impl Into<String>, datatype: DataType, records: Vec<Record>) -> Self {
        Self {
            variable: variable.into(),
            datatype,
            records,
        }
    }

    /// Create an empty dataset
    pub fn empty(variable: impl Into<String>, datatype: DataType) -> Self {
        Self::new(variable, datatype, Vec::new())
    }

    /// Name of the variable this dataset belongs to
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Declared datatype tag
    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    /// Records in timestamp order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record timestamps in order
    pub fn stamps(&self) -> Vec<Instant> {
        self.records.iter().map(|r| r.stamp).collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Storage class shared by all records
    ///
    /// `None` for an empty dataset, `DataClass::Unknown` when records
    /// disagree.
    pub fn data_class(&self) -> Option<DataClass> {
        let first = self.records.first()?.value.class();
        if self.records.iter().all(|r| r.value.class() == first) {
            Some(first)
        } else {
            Some(DataClass::Unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(secs: i64, value: RawValue) -> Record {
        Record::new(Instant::new(secs, 0), value)
    }

    #[test]
    fn test_data_class_homogeneous() {
        let ds = Dataset::new(
            "V",
            DataType::Numeric,
            vec![rec(1, RawValue::Long(1)), rec(2, RawValue::Long(2))],
        );
        assert_eq!(ds.data_class(), Some(DataClass::NumericLong));
    }

    #[test]
    fn test_data_class_mixed_is_unknown() {
        let ds = Dataset::new(
            "V",
            DataType::Numeric,
            vec![rec(1, RawValue::Long(1)), rec(2, RawValue::Double(2.0))],
        );
        assert_eq!(ds.data_class(), Some(DataClass::Unknown));
    }

    #[test]
    fn test_empty_dataset_has_no_class() {
        let ds = Dataset::empty("V", DataType::Textual);
        assert!(ds.is_empty());
        assert_eq!(ds.data_class(), None);
        assert!(ds.stamps().is_empty());
    }
}
