//! Retrieval modes composed from resolution and decoding
//!
//! - [`point`]: raw windows and nearest-point lookups
//! - [`aligned`]: secondary variables aligned to a master's timestamps
//! - [`stats`]: per-variable window statistics
//! - [`scaled`]: fixed-interval bucketing
//!
//! Every mode issues its backend requests one after the other and returns
//! an empty result, with a warning, when nothing resolves.

pub mod aligned;
pub mod point;
pub mod scaled;
pub mod stats;

pub use aligned::{AlignedData, AlignmentEngine};
pub use point::{PointRetriever, Upper, Window};
pub use scaled::{
    bucketize, ScaleAlgorithm, ScaleInterval, ScalingEngine, TimeScaling, MAX_DENSE_BUCKETS,
};
pub use stats::{Stat, StatisticsAggregator};

use tracing::info;

use crate::engine::MetaService;
use crate::error::Result;
use crate::types::Instant;

/// Fundamentals matching `pattern` in `[start, end]`, logged for the caller
pub(crate) fn find_fundamentals(
    meta: &dyn MetaService,
    start: Instant,
    end: Instant,
    pattern: &str,
) -> Result<Vec<String>> {
    info!(pattern = %pattern, "Querying fundamentals");
    let fundamentals = meta.fundamentals_like(start, end, pattern)?;
    if fundamentals.is_empty() {
        info!("No fundamental found in time window");
    } else {
        info!(fundamentals = %fundamentals.join(", "), "List of fundamentals found");
    }
    Ok(fundamentals)
}
