//! Beam-mode vocabulary and raw fill records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::Instant;

/// Named operational phase within a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum BeamModeValue {
    Setup,
    Abort,
    Injpilot,
    Injintr,
    Injnomn,
    Preramp,
    Ramp,
    Flattop,
    Squeeze,
    Adjust,
    Stable,
    Unstable,
    Beamdump,
    Rampdown,
    Recovery,
    Injdump,
    Circdump,
    Nobeam,
    Cycling,
}

impl BeamModeValue {
    /// Every recognized mode
    pub const ALL: [BeamModeValue; 19] = [
        BeamModeValue::Setup,
        BeamModeValue::Abort,
        BeamModeValue::Injpilot,
        BeamModeValue::Injintr,
        BeamModeValue::Injnomn,
        BeamModeValue::Preramp,
        BeamModeValue::Ramp,
        BeamModeValue::Flattop,
        BeamModeValue::Squeeze,
        BeamModeValue::Adjust,
        BeamModeValue::Stable,
        BeamModeValue::Unstable,
        BeamModeValue::Beamdump,
        BeamModeValue::Rampdown,
        BeamModeValue::Recovery,
        BeamModeValue::Injdump,
        BeamModeValue::Circdump,
        BeamModeValue::Nobeam,
        BeamModeValue::Cycling,
    ];

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            BeamModeValue::Setup => "SETUP",
            BeamModeValue::Abort => "ABORT",
            BeamModeValue::Injpilot => "INJPILOT",
            BeamModeValue::Injintr => "INJINTR",
            BeamModeValue::Injnomn => "INJNOMN",
            BeamModeValue::Preramp => "PRERAMP",
            BeamModeValue::Ramp => "RAMP",
            BeamModeValue::Flattop => "FLATTOP",
            BeamModeValue::Squeeze => "SQUEEZE",
            BeamModeValue::Adjust => "ADJUST",
            BeamModeValue::Stable => "STABLE",
            BeamModeValue::Unstable => "UNSTABLE",
            BeamModeValue::Beamdump => "BEAMDUMP",
            BeamModeValue::Rampdown => "RAMPDOWN",
            BeamModeValue::Recovery => "RECOVERY",
            BeamModeValue::Injdump => "INJDUMP",
            BeamModeValue::Circdump => "CIRCDUMP",
            BeamModeValue::Nobeam => "NOBEAM",
            BeamModeValue::Cycling => "CYCLING",
        }
    }

    /// Parse a filter list, splitting comma-separated entries
    ///
    /// Unrecognized names are dropped. The result keeps input order without
    /// duplicates.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Vec<BeamModeValue> {
        let mut modes = Vec::new();
        for name in names.iter().flat_map(|n| n.as_ref().split(',')) {
            if let Ok(mode) = name.parse::<BeamModeValue>() {
                if !modes.contains(&mode) {
                    modes.push(mode);
                }
            }
        }
        modes
    }
}

impl fmt::Display for BeamModeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BeamModeValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BeamModeValue::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid_argument(format!("unknown beam mode '{}'", wanted)))
    }
}

/// One beam-mode interval as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamModeRecord {
    /// Mode
    pub mode: BeamModeValue,
    /// Start of the interval
    pub start: Option<Instant>,
    /// End of the interval, absent while ongoing
    pub end: Option<Instant>,
}

/// One fill as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRecord {
    /// Fill number
    pub fill_number: u32,
    /// Start of the fill
    pub start: Option<Instant>,
    /// End of the fill, absent while ongoing
    pub end: Option<Instant>,
    /// Beam-mode intervals in chronological order
    pub beam_modes: Vec<BeamModeRecord>,
}

impl FillRecord {
    /// Whether the fill ran at any point during `[start, end]`
    pub fn overlaps(&self, start: Instant, end: Instant) -> bool {
        let begins_before_end = self.start.map_or(true, |s| s <= end);
        let ends_after_start = self.end.map_or(true, |e| e >= start);
        begins_before_end && ends_after_start
    }

    /// Whether any interval of the fill is in one of `modes`
    pub fn has_any_mode(&self, modes: &[BeamModeValue]) -> bool {
        self.beam_modes.iter().any(|bm| modes.contains(&bm.mode))
    }
}
