//! Timber - client-side retrieval layer for an accelerator logging service
//!
//! This library turns queries against a measurement logging service into
//! plain, consistently shaped results:
//! - Variable resolution by `%` pattern or explicit name list
//! - Timestamp conversion between calendar values, epoch seconds and
//!   nanosecond-precision instants
//! - Type-tagged dataset decoding (scalar, vector, matrix, string,
//!   presence; integer or floating)
//! - Raw, fundamental-filtered, master-aligned, statistical and
//!   fixed-interval retrieval
//! - Fill and beam-mode timelines
//! - A lazily discovered hierarchy of variable groupings
//!
//! The service itself sits behind the traits in [`engine`]; an in-memory
//! implementation is provided for tests and prototyping.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dataset;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod timestamp;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Logging subscriber setup
pub mod telemetry;

/// Raw, aligned, statistical and scaled retrieval
pub mod retrieval;

/// Fill and beam-mode timeline queries
pub mod fill;

/// Lazily discovered tree of variable groupings
pub mod hierarchy;

/// Caller-facing client
pub mod client;

// Re-export main types
pub use client::{LoggingDb, VectorMetadata};
pub use config::Config;
pub use dataset::{Dataset, Series, Values};
pub use engine::{InMemoryBackend, Services};
pub use error::{Error, Result};
pub use resolver::Selection;
pub use retrieval::{AlignedData, Stat, TimeScaling, Upper};
pub use timestamp::{TimeFormat, TimeInput};
pub use types::{DataType, Instant, TimeValue, Variable, VariableSet};
