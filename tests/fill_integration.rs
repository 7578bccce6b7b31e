//! Integration tests for fill and beam-mode queries

use std::sync::Arc;

use timber::fill::{BeamModeRecord, BeamModeValue, FillRecord, ModeSelector, ModeTimeField};
use timber::{Config, InMemoryBackend, Instant, LoggingDb, TimeFormat, TimeValue};

const T0: i64 = 1_538_352_000;

fn at(offset: i64) -> Instant {
    Instant::new(T0 + offset, 0)
}

fn mode(mode: BeamModeValue, start: i64, end: Option<i64>) -> BeamModeRecord {
    BeamModeRecord {
        mode,
        start: Some(at(start)),
        end: end.map(at),
    }
}

/// Three fills:
/// - 7000: SETUP, RAMP, FLATTOP, RAMP, STABLE, BEAMDUMP
/// - 7001: SETUP, NOBEAM
/// - 7002: SETUP, RAMP (ongoing)
fn create_test_db() -> LoggingDb {
    let backend = Arc::new(InMemoryBackend::new());
    backend.add_fill(FillRecord {
        fill_number: 7000,
        start: Some(at(0)),
        end: Some(at(1000)),
        beam_modes: vec![
            mode(BeamModeValue::Setup, 0, Some(100)),
            mode(BeamModeValue::Ramp, 100, Some(200)),
            mode(BeamModeValue::Flattop, 200, Some(300)),
            mode(BeamModeValue::Ramp, 300, Some(400)),
            mode(BeamModeValue::Stable, 400, Some(900)),
            mode(BeamModeValue::Beamdump, 900, Some(1000)),
        ],
    });
    backend.add_fill(FillRecord {
        fill_number: 7001,
        start: Some(at(1000)),
        end: Some(at(2000)),
        beam_modes: vec![
            mode(BeamModeValue::Setup, 1000, Some(1500)),
            mode(BeamModeValue::Nobeam, 1500, Some(2000)),
        ],
    });
    backend.add_fill(FillRecord {
        fill_number: 7002,
        start: Some(at(2000)),
        end: None,
        beam_modes: vec![
            mode(BeamModeValue::Setup, 2000, Some(2100)),
            mode(BeamModeValue::Ramp, 2100, None),
        ],
    });
    LoggingDb::with_backend(backend, Config::default()).expect("valid config")
}

#[test]
fn test_fill_by_number() {
    let db = create_test_db();
    let fill = db.get_lhc_fill_data(Some(7000), TimeFormat::Unix).unwrap().unwrap();
    assert_eq!(fill.fill_number, 7000);
    assert_eq!(fill.start_time, Some(TimeValue::Unix(T0 as f64)));
    assert_eq!(fill.beam_modes.len(), 6);
    assert_eq!(fill.beam_modes[1].mode, BeamModeValue::Ramp);

    assert!(db.get_lhc_fill_data(Some(42), TimeFormat::Unix).unwrap().is_none());
}

#[test]
fn test_last_completed_fill() {
    let db = create_test_db();
    let fill = db.get_lhc_fill_data(None, TimeFormat::Calendar).unwrap().unwrap();
    assert_eq!(fill.fill_number, 7001);
    assert!(fill.end_time.unwrap().as_calendar().is_some());
}

#[test]
fn test_fills_by_time() {
    let db = create_test_db();
    let fills = db
        .get_lhc_fills_by_time(at(500), at(1500), None::<&[&str]>, TimeFormat::Unix)
        .unwrap();
    let numbers: Vec<u32> = fills.iter().map(|f| f.fill_number).collect();
    assert_eq!(numbers, vec![7000, 7001]);
}

#[test]
fn test_fills_by_time_with_modes() {
    let db = create_test_db();
    let fills = db
        .get_lhc_fills_by_time(at(0), at(3000), Some(&["STABLE,BOGUS"][..]), TimeFormat::Unix)
        .unwrap();
    let numbers: Vec<u32> = fills.iter().map(|f| f.fill_number).collect();
    assert_eq!(numbers, vec![7000]);

    let fills = db
        .get_lhc_fills_by_time(at(0), at(3000), Some(&["nobeam", "ramp"][..]), TimeFormat::Unix)
        .unwrap();
    assert_eq!(fills.len(), 3);
}

#[test]
fn test_no_valid_beam_modes_is_an_error() {
    let db = create_test_db();
    let err = db
        .get_lhc_fills_by_time(at(0), at(3000), Some(&["WARP", "HYPER"][..]), TimeFormat::Unix)
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("no valid beam modes found"));
}

#[test]
fn test_intervals_default_selection() {
    let db = create_test_db();
    let intervals = db
        .get_intervals_by_lhc_modes(
            at(0),
            at(3000),
            ModeSelector::first_start(BeamModeValue::Ramp),
            ModeSelector::last_end(BeamModeValue::Stable),
            TimeFormat::Unix,
        )
        .unwrap();

    // 7002 has RAMP but no STABLE, 7001 has neither
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].fill_number, 7000);
    assert_eq!(intervals[0].mode1_time, Some(TimeValue::Unix((T0 + 100) as f64)));
    assert_eq!(intervals[0].mode2_time, Some(TimeValue::Unix((T0 + 900) as f64)));
}

#[test]
fn test_intervals_negative_index_and_end_field() {
    let db = create_test_db();
    let last_ramp_end = ModeSelector {
        mode: BeamModeValue::Ramp,
        field: ModeTimeField::End,
        index: -1,
    };
    let intervals = db
        .get_intervals_by_lhc_modes(
            at(0),
            at(1000),
            last_ramp_end,
            ModeSelector::first_start(BeamModeValue::Beamdump),
            TimeFormat::Unix,
        )
        .unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].mode1_time, Some(TimeValue::Unix((T0 + 400) as f64)));
    assert_eq!(intervals[0].mode2_time, Some(TimeValue::Unix((T0 + 900) as f64)));
}

#[test]
fn test_intervals_index_out_of_range_skips_fill() {
    let db = create_test_db();
    let third_ramp = ModeSelector {
        mode: BeamModeValue::Ramp,
        field: ModeTimeField::Start,
        index: 2,
    };
    let intervals = db
        .get_intervals_by_lhc_modes(
            at(0),
            at(3000),
            third_ramp,
            ModeSelector::first_start(BeamModeValue::Setup),
            TimeFormat::Unix,
        )
        .unwrap();
    assert!(intervals.is_empty());
}
