//! Trading-day segmentation and session-open alignment.
//!
//! Raw feeds carry no explicit day markers: a new trading day starts
//! wherever two consecutive prints are separated by an overnight gap.
//! The first print of a day is then snapped to 09:30 exchange time.

use forecast_core::{RawBar, UnixSeconds, SECONDS_PER_DAY, TIME_REFERENCE};
use std::ops::Range;

/// Minimum gap between consecutive raw bars that starts a new day.
pub const DAY_GAP_SECONDS: f64 = 8.0 * 3600.0;

/// 09:30 at UTC-4, seconds after reference midnight.
const OPEN_DAYLIGHT: f64 = 9.5 * 3600.0;

/// 09:30 at UTC-5, seconds after reference midnight.
const OPEN_STANDARD: f64 = 10.5 * 3600.0;

/// Start indices of each trading day. `starts[0] == 0` for non-empty input.
pub fn day_starts(bars: &[RawBar]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut check = 0;

    while check < bars.len() {
        starts.push(check);
        let mut end = check + 1;
        while end < bars.len() && bars[end].time - bars[end - 1].time < DAY_GAP_SECONDS {
            end += 1;
        }
        check = end;
    }

    starts
}

/// Index ranges of each trading day, contiguous and covering `bars`.
pub fn day_segments(bars: &[RawBar]) -> Vec<Range<usize>> {
    let starts = day_starts(bars);
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(bars.len());
            start..end
        })
        .collect()
}

/// Maps a raw timestamp to the 09:30 session open of its trading day.
///
/// The reference instant is local midnight under the daylight offset. A
/// timestamp less than 10.5 hours past a reference-aligned midnight is
/// taken to be on daylight time (open at +9.5h); anything later is taken
/// to be on standard time (open at +10.5h, which is 09:30 at UTC-5).
///
/// A daylight-time day whose first print arrives after 10:30 local is
/// classified as standard time. That matches the historical feed and is
/// kept as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionAligner {
    reference: UnixSeconds,
}

impl SessionAligner {
    /// Create an aligner anchored at `reference` (local midnight).
    pub fn new(reference: UnixSeconds) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> UnixSeconds {
        self.reference
    }

    /// Session open (unix seconds) for the day containing `time`.
    pub fn align(&self, time: UnixSeconds) -> UnixSeconds {
        let since_reference = time - self.reference;
        let midnight = since_reference.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY;
        let delta = since_reference.rem_euclid(SECONDS_PER_DAY);

        let open = if delta < OPEN_STANDARD {
            OPEN_DAYLIGHT
        } else {
            OPEN_STANDARD
        };
        self.reference + midnight + open
    }

    /// Days since the reference for a unix time.
    pub fn day_offset(&self, time: UnixSeconds) -> f64 {
        (time - self.reference) / SECONDS_PER_DAY
    }
}

impl Default for SessionAligner {
    fn default() -> Self {
        Self::new(TIME_REFERENCE)
    }
}
