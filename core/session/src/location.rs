//! Script locations and source ranges.

use std::fmt;

use inspector_protocol::{
    ScriptId,
    debugger::{BreakLocationPayload, BreakLocationType, LocationPayload, LocationRangePayload},
};

pub use inspector_protocol::debugger::ScriptPosition;

/// A raw (generated code) location inside a script.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Script the location belongs to.
    pub script_id: ScriptId,
    /// Zero-based line.
    pub line_number: u32,
    /// Zero-based column, when known.
    pub column_number: Option<u32>,
    /// Index of the inlined frame this location was derived for.
    pub inline_frame_index: u32,
}

impl Location {
    /// Creates a location in the outermost (non-inlined) frame.
    #[must_use]
    pub fn new(script_id: ScriptId, line_number: u32, column_number: Option<u32>) -> Self {
        Self {
            script_id,
            line_number,
            column_number,
            inline_frame_index: 0,
        }
    }

    /// Creates a location from its wire form.
    #[must_use]
    pub fn from_payload(payload: &LocationPayload) -> Self {
        Self::new(
            payload.script_id.clone(),
            payload.line_number,
            payload.column_number,
        )
    }

    /// Returns the wire form of this location.
    #[must_use]
    pub fn payload(&self) -> LocationPayload {
        LocationPayload {
            script_id: self.script_id.clone(),
            line_number: self.line_number,
            column_number: self.column_number,
        }
    }

    /// Returns `true` if both locations point at the same script, line and column.
    #[must_use]
    pub fn same_position(&self, other: &Self) -> bool {
        self.script_id == other.script_id
            && self.line_number == other.line_number
            && self.column_number == other.column_number
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.script_id,
            self.line_number,
            self.column_number.unwrap_or(0),
            self.inline_frame_index
        )
    }
}

/// A pair of raw locations, as returned by the auto-step range strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLocationRange {
    /// Inclusive start.
    pub start: Location,
    /// End of the range.
    pub end: Location,
}

/// A source range of one script.
///
/// Ranges are totally ordered by `(script_id, start, end)`; the field order of
/// the struct is that order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationRange {
    /// Script of the range.
    pub script_id: ScriptId,
    /// Start position.
    pub start: ScriptPosition,
    /// End position.
    pub end: ScriptPosition,
}

impl LocationRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(script_id: ScriptId, start: ScriptPosition, end: ScriptPosition) -> Self {
        Self {
            script_id,
            start,
            end,
        }
    }

    /// Converts a pair of raw locations. Missing columns count as column 0.
    #[must_use]
    pub fn from_raw(range: &RawLocationRange) -> Self {
        Self::new(
            range.start.script_id.clone(),
            ScriptPosition::new(range.start.line_number, range.start.column_number.unwrap_or(0)),
            ScriptPosition::new(range.end.line_number, range.end.column_number.unwrap_or(0)),
        )
    }

    /// Returns `true` if both ranges belong to the same script and their
    /// `[start, end]` intervals touch or intersect.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> bool {
        if self.script_id != other.script_id {
            return false;
        }
        match self.start.cmp(&other.start) {
            std::cmp::Ordering::Less => self.end >= other.start,
            std::cmp::Ordering::Greater => self.start <= other.end,
            std::cmp::Ordering::Equal => true,
        }
    }

    /// Returns the wire form of this range.
    #[must_use]
    pub fn payload(&self) -> LocationRangePayload {
        LocationRangePayload {
            script_id: self.script_id.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// Sorts `ranges` and folds overlapping ranges of the same script together.
///
/// The output is sorted and pairwise non-overlapping, so feeding it back in
/// returns it unchanged.
#[must_use]
pub fn sort_and_merge_ranges(mut ranges: Vec<LocationRange>) -> Vec<LocationRange> {
    ranges.sort();
    let mut merged: Vec<LocationRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(previous) if previous.overlap(&range) => {
                if range.end > previous.end {
                    previous.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// A location where the backend reports a breakpoint could be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakLocation {
    /// The location.
    pub location: Location,
    /// What kind of break this is, if known.
    pub kind: Option<BreakLocationType>,
}

impl BreakLocation {
    pub(crate) fn from_payload(payload: BreakLocationPayload) -> Self {
        Self {
            location: Location::new(payload.script_id, payload.line_number, payload.column_number),
            kind: payload.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn range(script: &str, start: (u32, u32), end: (u32, u32)) -> LocationRange {
        LocationRange::new(
            ScriptId::from(script),
            ScriptPosition::new(start.0, start.1),
            ScriptPosition::new(end.0, end.1),
        )
    }

    #[test]
    fn merges_overlapping_ranges_of_one_script() {
        let merged = sort_and_merge_ranges(vec![
            range("s", (1, 3), (1, 8)),
            range("t", (1, 0), (1, 4)),
            range("s", (1, 0), (1, 5)),
        ]);
        assert_eq!(
            merged,
            [range("s", (1, 0), (1, 8)), range("t", (1, 0), (1, 4))]
        );
    }

    #[test]
    fn merging_is_idempotent() {
        let input = vec![
            range("a", (0, 0), (0, 10)),
            range("a", (0, 10), (2, 0)),
            range("a", (3, 0), (3, 1)),
            range("b", (0, 5), (0, 6)),
            range("a", (1, 0), (1, 2)),
        ];
        let once = sort_and_merge_ranges(input);
        let twice = sort_and_merge_ranges(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn contained_range_keeps_outer_end() {
        let merged = sort_and_merge_ranges(vec![range("s", (0, 0), (5, 0)), range("s", (1, 0), (2, 0))]);
        assert_eq!(merged, [range("s", (0, 0), (5, 0))]);
    }

    #[test_case((1, 0), (1, 5), (1, 5), (1, 9), true ; "touching")]
    #[test_case((1, 0), (1, 5), (1, 6), (1, 9), false ; "disjoint")]
    #[test_case((1, 6), (1, 9), (1, 0), (1, 5), false ; "disjoint reversed")]
    #[test_case((2, 0), (2, 1), (2, 0), (9, 0), true ; "same start")]
    fn overlap(a0: (u32, u32), a1: (u32, u32), b0: (u32, u32), b1: (u32, u32), expected: bool) {
        assert_eq!(range("s", a0, a1).overlap(&range("s", b0, b1)), expected);
    }

    #[test]
    fn different_scripts_never_overlap() {
        assert!(!range("s", (0, 0), (9, 9)).overlap(&range("t", (0, 0), (9, 9))));
    }

    #[test]
    fn location_display() {
        let mut location = Location::new(ScriptId::from("12"), 3, None);
        location.inline_frame_index = 1;
        assert_eq!(location.to_string(), "12:3:0:1");
    }
}
