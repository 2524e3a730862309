//! Fixed-grid bar aggregation.
//!
//! Resamples a symbol's raw minute bars onto `ceil(390 / period)` slots per
//! trading day. Slot `k` covers raw bars whose end time lies in
//! `(open + k*period, open + (k+1)*period]`. Empty slots are filled from
//! the last consumed raw bar so every day has the same number of bars and
//! the output never contains gaps.

use crate::session::{day_segments, SessionAligner};
use forecast_core::{
    intervals_per_day, AggregatedBar, AggregatedSeries, Error, RawBar, Result,
};
use std::ops::Range;
use tracing::{debug, trace};

/// Carry-forward state threaded through one symbol's aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CarryState {
    /// Whether any raw bar has been aggregated yet.
    pub observed_any_bar: bool,
    /// Close of the last aggregated raw bar.
    pub last_close: f64,
}

impl CarryState {
    /// Price used for an empty slot. Before anything has been consumed the
    /// series' first raw open stands in.
    fn fill_price(&self, first_open: f64) -> f64 {
        if self.observed_any_bar {
            self.last_close
        } else {
            first_open
        }
    }
}

/// Counters describing one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Trading days found.
    pub days: usize,
    /// Raw bars folded into slots.
    pub consumed_raw: usize,
    /// Raw bars outside every session window.
    pub skipped_raw: usize,
    /// Slots filled by carry-forward.
    pub filled_bars: usize,
}

/// A slot that's currently being built.
#[derive(Debug, Clone, Default)]
struct BarInProgress {
    open: Option<f64>,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl BarInProgress {
    fn new() -> Self {
        Self {
            open: None,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            close: 0.0,
            volume: 0.0,
        }
    }

    fn add_bar(&mut self, raw: &RawBar) {
        if self.open.is_none() {
            self.open = Some(raw.open);
        }
        self.high = self.high.max(raw.high);
        self.low = self.low.min(raw.low);
        self.close = raw.close;
        self.volume += raw.volume;
    }

    fn to_bar(&self, day_offset: f64) -> Option<AggregatedBar> {
        let open = self.open?;
        Some(AggregatedBar {
            day_offset,
            close: self.close,
            high: self.high,
            low: self.low,
            open,
            volume: self.volume,
        })
    }
}

/// Aggregates raw minute bars onto a fixed per-day grid.
#[derive(Debug, Clone)]
pub struct BarAggregator {
    period: u32,
    intervals_per_day: usize,
    aligner: SessionAligner,
}

impl BarAggregator {
    /// Create an aggregator for `period` minutes per bar.
    pub fn new(period: u32) -> Result<Self> {
        if period == 0 {
            return Err(Error::config("aggregation period must be at least one minute"));
        }
        Ok(Self {
            period,
            intervals_per_day: intervals_per_day(period),
            aligner: SessionAligner::default(),
        })
    }

    /// Use a different session aligner.
    pub fn with_aligner(mut self, aligner: SessionAligner) -> Self {
        self.aligner = aligner;
        self
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn intervals_per_day(&self) -> usize {
        self.intervals_per_day
    }

    fn period_seconds(&self) -> f64 {
        self.period as f64 * 60.0
    }

    /// Aggregate a full raw series.
    pub fn aggregate(&self, raw: &[RawBar]) -> AggregatedSeries {
        self.aggregate_with_stats(raw).0
    }

    /// Aggregate a full raw series and report what happened to the input.
    pub fn aggregate_with_stats(&self, raw: &[RawBar]) -> (AggregatedSeries, AggregationStats) {
        let segments = day_segments(raw);
        let mut stats = AggregationStats {
            days: segments.len(),
            ..Default::default()
        };
        let mut bars = Vec::with_capacity(segments.len() * self.intervals_per_day);
        let mut carry = CarryState::default();
        let mut cursor = 0;

        for segment in segments {
            self.aggregate_day(raw, segment, &mut cursor, &mut carry, &mut bars, &mut stats);
        }

        // Prints after the last session window of the last day.
        stats.skipped_raw += raw.len() - cursor;

        debug!(
            days = stats.days,
            bars = bars.len(),
            consumed = stats.consumed_raw,
            skipped = stats.skipped_raw,
            filled = stats.filled_bars,
            "aggregated raw bars"
        );

        let series = AggregatedSeries {
            period: self.period,
            intervals_per_day: self.intervals_per_day,
            num_days: stats.days,
            bars,
        };
        (series, stats)
    }

    /// Aggregate one trading day, advancing `cursor` through `raw`.
    fn aggregate_day(
        &self,
        raw: &[RawBar],
        segment: Range<usize>,
        cursor: &mut usize,
        carry: &mut CarryState,
        out: &mut Vec<AggregatedBar>,
        stats: &mut AggregationStats,
    ) {
        let session_open = self.aligner.align(raw[segment.start].time);
        let first_open = raw[0].open;
        trace!(
            start = segment.start,
            end = segment.end,
            session_open,
            "aggregating day"
        );

        for interval in 0..self.intervals_per_day {
            let window_start = session_open + interval as f64 * self.period_seconds();
            let window_end = session_open + (interval + 1) as f64 * self.period_seconds();
            let day_offset = self.aligner.day_offset(window_start);

            while *cursor < raw.len() && raw[*cursor].time <= window_start {
                stats.skipped_raw += 1;
                *cursor += 1;
            }

            let mut bar = BarInProgress::new();
            while *cursor < raw.len() && raw[*cursor].time <= window_end {
                bar.add_bar(&raw[*cursor]);
                carry.observed_any_bar = true;
                carry.last_close = raw[*cursor].close;
                stats.consumed_raw += 1;
                *cursor += 1;
            }

            let aggregated = match bar.to_bar(day_offset) {
                Some(aggregated) => aggregated,
                None => {
                    stats.filled_bars += 1;
                    AggregatedBar::flat(day_offset, carry.fill_price(first_open))
                }
            };
            out.push(aggregated);
        }
    }
}
