//! Fill and beam-mode timeline
//!
//! ```text
//!  fill 7000  |---------------------------------------------------|
//!  modes      |SETUP|INJPHYS..|PRERAMP|RAMP|FLATTOP|..|STABLE|..|
//!                                     ^ mode1 start    ^ mode2 end
//! ```
//!
//! Fill records from the backend are converted into caller-facing [`Fill`]
//! values with timestamps in the requested format. Interval extraction picks
//! one occurrence of each of two modes per fill.

pub mod beam_mode;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::engine::FillService;
use crate::error::{Error, Result};
use crate::timestamp::{decode, TimeFormat};
use crate::types::{Instant, TimeValue};

pub use beam_mode::{BeamModeRecord, BeamModeValue, FillRecord};

/// One beam-mode interval of a fill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamMode {
    /// Mode
    pub mode: BeamModeValue,
    /// Start of the interval
    pub start_time: Option<TimeValue>,
    /// End of the interval, absent while ongoing
    pub end_time: Option<TimeValue>,
}

impl BeamMode {
    fn time(&self, field: ModeTimeField) -> Option<TimeValue> {
        match field {
            ModeTimeField::Start => self.start_time,
            ModeTimeField::End => self.end_time,
        }
    }
}

/// One fill with its beam modes in chronological order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    /// Fill number
    pub fill_number: u32,
    /// Start of the fill
    pub start_time: Option<TimeValue>,
    /// End of the fill, absent while ongoing
    pub end_time: Option<TimeValue>,
    /// Beam modes; a mode may occur several times
    pub beam_modes: Vec<BeamMode>,
}

impl Fill {
    /// Convert a backend record
    pub fn from_record(record: &FillRecord, format: TimeFormat) -> Self {
        Self {
            fill_number: record.fill_number,
            start_time: decode(record.start, format),
            end_time: decode(record.end, format),
            beam_modes: record
                .beam_modes
                .iter()
                .map(|bm| BeamMode {
                    mode: bm.mode,
                    start_time: decode(bm.start, format),
                    end_time: decode(bm.end, format),
                })
                .collect(),
        }
    }

    /// Selected instants of every occurrence of `mode`
    pub fn occurrences(&self, mode: BeamModeValue, field: ModeTimeField) -> Vec<Option<TimeValue>> {
        self.beam_modes
            .iter()
            .filter(|bm| bm.mode == mode)
            .map(|bm| bm.time(field))
            .collect()
    }
}

/// Which bound of a beam-mode interval to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModeTimeField {
    /// Interval start
    #[default]
    Start,
    /// Interval end
    End,
}

impl ModeTimeField {
    /// Field name as callers spell it
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeTimeField::Start => "startTime",
            ModeTimeField::End => "endTime",
        }
    }
}

impl fmt::Display for ModeTimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeTimeField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "startTime" | "start" => Ok(ModeTimeField::Start),
            "endTime" | "end" => Ok(ModeTimeField::End),
            other => Err(Error::invalid_argument(format!(
                "unknown beam mode time field '{}', expected startTime or endTime",
                other
            ))),
        }
    }
}

/// Interval between two beam-mode occurrences within one fill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeInterval {
    /// Fill number
    pub fill_number: u32,
    /// Selected instant of the first mode
    pub mode1_time: Option<TimeValue>,
    /// Selected instant of the second mode
    pub mode2_time: Option<TimeValue>,
}

/// Selection of one mode occurrence for interval extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSelector {
    /// Mode to look for
    pub mode: BeamModeValue,
    /// Interval bound to report
    pub field: ModeTimeField,
    /// Occurrence index; negative values count from the last occurrence
    pub index: i64,
}

impl ModeSelector {
    /// First occurrence, reporting its start
    pub fn first_start(mode: BeamModeValue) -> Self {
        Self {
            mode,
            field: ModeTimeField::Start,
            index: 0,
        }
    }

    /// Last occurrence, reporting its end
    pub fn last_end(mode: BeamModeValue) -> Self {
        Self {
            mode,
            field: ModeTimeField::End,
            index: -1,
        }
    }

    fn pick(&self, fill: &Fill) -> Option<Option<TimeValue>> {
        let found = fill.occurrences(self.mode, self.field);
        let idx = resolve_index(self.index, found.len())?;
        found.get(idx).copied()
    }
}

/// Map a possibly negative index onto `0..len`
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if index < 0 { len + index } else { index };
    (0..len).contains(&idx).then_some(idx as usize)
}

/// Fill queries over a [`FillService`]
pub struct FillTimeline {
    fills: Arc<dyn FillService>,
}

impl FillTimeline {
    /// Create a timeline
    pub fn new(fills: Arc<dyn FillService>) -> Self {
        Self { fills }
    }

    /// One fill by number, or the last completed fill when `fill_number` is `None`
    pub fn get_lhc_fill_data(
        &self,
        fill_number: Option<u32>,
        format: TimeFormat,
    ) -> Result<Option<Fill>> {
        let record = match fill_number {
            Some(n) => self.fills.fill_by_number(n)?,
            None => self.fills.last_completed_fill()?,
        };
        Ok(record.map(|r| Fill::from_record(&r, format)))
    }

    /// Fills overlapping `[start, end]`, optionally only those containing one of `beam_modes`
    ///
    /// Each filter entry may itself be a comma-separated list. Unknown mode
    /// names are ignored.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` when a filter is given but none of its
    /// names is a known beam mode.
    pub fn get_lhc_fills_by_time<S: AsRef<str>>(
        &self,
        start: Instant,
        end: Instant,
        beam_modes: Option<&[S]>,
        format: TimeFormat,
    ) -> Result<Vec<Fill>> {
        let numbers = match beam_modes {
            None => self.fills.fills_in_window(start, end)?,
            Some(names) => {
                let modes = BeamModeValue::parse_list(names);
                if modes.is_empty() {
                    return Err(Error::invalid_argument("no valid beam modes found"));
                }
                self.fills_with_modes(start, end, &modes)?
            }
        };
        info!(count = numbers.len(), "Fills found in window");

        let mut out = Vec::with_capacity(numbers.len());
        for n in numbers {
            match self.fills.fill_by_number(n)? {
                Some(record) => out.push(Fill::from_record(&record, format)),
                None => debug!(fill = n, "Fill listed in window but not found"),
            }
        }
        Ok(out)
    }

    /// For each fill in the window that contains both modes, the selected instants
    ///
    /// Fills lacking either mode, or where an index is out of range, are
    /// skipped.
    pub fn get_intervals_by_lhc_modes(
        &self,
        start: Instant,
        end: Instant,
        mode1: ModeSelector,
        mode2: ModeSelector,
        format: TimeFormat,
    ) -> Result<Vec<ModeInterval>> {
        let filter = [mode1.mode.as_str(), mode2.mode.as_str()];
        let fills = self.get_lhc_fills_by_time(start, end, Some(&filter[..]), format)?;

        let mut out = Vec::new();
        for fill in &fills {
            if fill.occurrences(mode1.mode, mode1.field).is_empty()
                || fill.occurrences(mode2.mode, mode2.field).is_empty()
            {
                continue;
            }
            match (mode1.pick(fill), mode2.pick(fill)) {
                (Some(t1), Some(t2)) => out.push(ModeInterval {
                    fill_number: fill.fill_number,
                    mode1_time: t1,
                    mode2_time: t2,
                }),
                _ => debug!(
                    fill = fill.fill_number,
                    mode1_index = mode1.index,
                    mode2_index = mode2.index,
                    "Beam mode index out of range, skipping fill"
                ),
            }
        }
        Ok(out)
    }

    fn fills_with_modes(
        &self,
        start: Instant,
        end: Instant,
        modes: &[BeamModeValue],
    ) -> Result<Vec<u32>> {
        debug!(modes = ?modes, "Filtering fills by beam mode");
        self.fills.fills_in_window_with_modes(start, end, modes)
    }
}
