//! Property-based tests for conversions and retrieval invariants
//!
//! Uses proptest to check timestamp round trips, name sanitization and the
//! aligned-length guarantee over generated inputs.

use std::sync::Arc;

use proptest::prelude::*;

use timber::hierarchy::sanitize_name;
use timber::timestamp::{decode, encode};
use timber::{
    Config, DataType, InMemoryBackend, Instant, LoggingDb, TimeFormat, TimeInput, Variable,
};

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Epoch seconds with a fractional part, 1970 to ~2096
fn epoch_seconds() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0.0..4e9f64),
        (0i64..4_000_000_000).prop_map(|s| s as f64),
        (0i64..4_000_000, 0u32..1000).prop_map(|(s, ms)| s as f64 * 1000.0 + ms as f64 / 1000.0),
    ]
}

/// Raw hierarchy names, including every replaced character and leading digits
fn raw_name() -> impl Strategy<Value = String> {
    "[0-9A-Za-z _;<>/:.\\-]{0,24}"
}

/// Strictly increasing sample offsets in seconds
fn offsets(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..600, 0..max_len).prop_map(|deltas| {
        let mut current = 0i64;
        deltas
            .into_iter()
            .map(|d| {
                current += d;
                current
            })
            .collect()
    })
}

// =============================================================================
// Timestamp round trip
// =============================================================================

proptest! {
    #[test]
    fn prop_epoch_round_trip(t in epoch_seconds()) {
        let instant = encode(t).unwrap().unwrap();
        let back = decode(Some(instant), TimeFormat::Unix).unwrap().epoch_seconds();
        prop_assert!((back - t).abs() <= 1e-6, "{} -> {} -> {}", t, instant, back);
    }

    #[test]
    fn prop_instant_keeps_nanos(secs in 0i64..4_000_000_000, nanos in 0u32..1_000_000_000) {
        let instant = Instant::new(secs, nanos);
        prop_assert_eq!(encode(instant).unwrap(), Some(instant));

        let calendar = decode(Some(instant), TimeFormat::Calendar).unwrap();
        let dt = *calendar.as_calendar().unwrap();
        let again = encode(TimeInput::Calendar(dt)).unwrap().unwrap();
        prop_assert_eq!(again.nanos(), nanos);
        prop_assert_eq!(again, instant);
    }
}

// =============================================================================
// Sanitization
// =============================================================================

proptest! {
    #[test]
    fn prop_sanitize_is_idempotent(name in raw_name()) {
        let once = sanitize_name(&name);
        prop_assert_eq!(sanitize_name(&once), once.clone());
    }

    #[test]
    fn prop_sanitized_is_identifier_like(name in raw_name()) {
        let clean = sanitize_name(&name);
        prop_assert!(!clean.starts_with(|c: char| c.is_ascii_digit()));
        prop_assert!(clean.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
}

// =============================================================================
// Alignment
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_aligned_lengths_match_master(
        master in offsets(40),
        other in offsets(40).prop_filter("needs data", |o| !o.is_empty()),
    ) {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_variable(Variable::new("M", DataType::Numeric));
        backend.add_variable(Variable::new("S", DataType::Numeric));
        let samples = |offs: &[i64]| -> Vec<(Instant, f64)> {
            offs.iter().map(|o| (Instant::new(*o, 0), *o as f64)).collect()
        };
        backend.add_samples("M", &samples(&master));
        backend.add_samples("S", &samples(&other));

        let db = LoggingDb::with_backend(backend, Config::default()).unwrap();
        let out = db
            .get_aligned(vec!["M", "S"], 0i64, 100_000i64, None, None, TimeFormat::Unix)
            .unwrap();

        prop_assert_eq!(out.timestamps.len(), master.len());
        for values in out.values.values() {
            prop_assert_eq!(values.len(), master.len());
        }
    }
}
