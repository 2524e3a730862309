//! Core data types for the forecasting pipeline.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unix time in seconds. Raw feeds carry fractional seconds.
pub type UnixSeconds = f64;

/// Seconds in a calendar day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Length of the regular trading session, 09:30 to 16:00.
pub const SESSION_MINUTES: u32 = 390;

/// 2014-04-02 00:00:00 UTC-04:00, the epoch for aggregated day offsets.
pub const TIME_REFERENCE: UnixSeconds = 1_396_411_200.0;

/// Number of aggregated bars per trading day for a period in minutes.
#[inline]
pub fn intervals_per_day(period_minutes: u32) -> usize {
    SESSION_MINUTES.div_ceil(period_minutes.max(1)) as usize
}

/// Convert unix seconds to a UTC datetime, if representable.
pub fn unix_to_datetime(secs: UnixSeconds) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

/// Convert an aggregated day offset back to a UTC datetime.
pub fn day_offset_to_datetime(day_offset: f64) -> Option<DateTime<Utc>> {
    unix_to_datetime(TIME_REFERENCE + day_offset * SECONDS_PER_DAY)
}

/// One raw per-minute bar as delivered by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    /// End of the raw interval, unix seconds.
    pub time: UnixSeconds,
    /// Close price.
    pub close: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Open price.
    pub open: f64,
    /// Share volume.
    pub volume: f64,
}

impl RawBar {
    /// Check that prices are positive and finite and volume is non-negative.
    pub fn validate(&self) -> Result<()> {
        let prices = [self.close, self.high, self.low, self.open];
        if !self.time.is_finite() {
            return Err(Error::data(format!("non-finite timestamp {}", self.time)));
        }
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(Error::data(format!(
                "non-positive price in bar at {}: close={} high={} low={} open={}",
                self.time, self.close, self.high, self.low, self.open
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(Error::data(format!(
                "invalid volume {} in bar at {}",
                self.volume, self.time
            )));
        }
        Ok(())
    }
}

/// Validate a whole raw series: every bar valid and timestamps ascending.
pub fn validate_raw_series(bars: &[RawBar]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate()?;
        if i > 0 && bar.time < bars[i - 1].time {
            return Err(Error::data(format!(
                "raw bars out of order at index {}: {} < {}",
                i,
                bar.time,
                bars[i - 1].time
            )));
        }
    }
    Ok(())
}

/// One bar on the fixed aggregation grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBar {
    /// Start of the interval in days since [`TIME_REFERENCE`].
    pub day_offset: f64,
    /// Close price.
    pub close: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Open price.
    pub open: f64,
    /// Total volume.
    pub volume: f64,
}

impl AggregatedBar {
    /// A zero-volume bar with all four prices equal.
    pub fn flat(day_offset: f64, price: f64) -> Self {
        Self {
            day_offset,
            close: price,
            high: price,
            low: price,
            open: price,
            volume: 0.0,
        }
    }

    /// The six raw fields in feature-column order.
    #[inline]
    pub fn fields(&self) -> [f64; 6] {
        [
            self.day_offset,
            self.close,
            self.high,
            self.low,
            self.open,
            self.volume,
        ]
    }
}

/// A symbol's aggregated bars plus the grid they were built on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    /// Minutes per aggregated bar.
    pub period: u32,
    /// Bars per trading day.
    pub intervals_per_day: usize,
    /// Number of trading days.
    pub num_days: usize,
    /// `num_days * intervals_per_day` bars.
    pub bars: Vec<AggregatedBar>,
}

impl AggregatedSeries {
    /// An empty series on the grid for `period`.
    pub fn empty(period: u32) -> Self {
        Self {
            period,
            intervals_per_day: intervals_per_day(period),
            num_days: 0,
            bars: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars belonging to day `day`.
    pub fn day(&self, day: usize) -> &[AggregatedBar] {
        let start = day * self.intervals_per_day;
        &self.bars[start..start + self.intervals_per_day]
    }
}

/// Dense row-major matrix of feature values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    width: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// An empty matrix with `width` columns.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            values: Vec::new(),
        }
    }

    /// A zero-filled matrix.
    pub fn zeros(rows: usize, width: usize) -> Self {
        Self {
            width,
            values: vec![0.0; rows * width],
        }
    }

    /// Wrap row-major values, checking the shape.
    pub fn from_values(width: usize, values: Vec<f64>) -> Result<Self> {
        if width == 0 {
            return Err(Error::data("feature matrix width must be positive"));
        }
        if values.len() % width != 0 {
            return Err(Error::data(format!(
                "{} values do not divide into rows of width {}",
                values.len(),
                width
            )));
        }
        Ok(Self { width, values })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.width + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.width..(row + 1) * self.width]
    }

    /// Iterate one column top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().skip(col).step_by(self.width.max(1)).copied()
    }

    /// Overwrite one column from a slice of length `rows()`.
    pub fn fill_column(&mut self, col: usize, column: &[f64]) {
        debug_assert_eq!(column.len(), self.rows());
        for (row, value) in column.iter().enumerate() {
            self.values[row * self.width + col] = *value;
        }
    }

    /// Append one row.
    pub fn push_row(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.width {
            return Err(Error::data(format!(
                "row of width {} pushed into matrix of width {}",
                row.len(),
                self.width
            )));
        }
        self.values.extend_from_slice(row);
        Ok(())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Feature rows for one symbol, parallel to its aggregated bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSeries {
    /// Minutes per aggregated bar.
    pub period: u32,
    /// Bars per trading day.
    pub intervals_per_day: usize,
    /// Number of trading days.
    pub num_days: usize,
    /// One row per aggregated bar.
    pub matrix: FeatureMatrix,
}

impl FeatureSeries {
    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn width(&self) -> usize {
        self.matrix.width()
    }
}

/// Which aggregated price a simulated position is bought at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPrice {
    /// Open of the decision bar.
    #[default]
    Open,
    /// High of the decision bar (pessimistic fill).
    High,
}

/// A single labeled training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExample {
    /// Lookback feature window.
    pub features: Vec<f64>,
    /// Outcome score in `[0, 1]`.
    pub outcome: f64,
    /// Day offset of the decision bar.
    pub timestamp: f64,
}

/// Aligned features/outcomes/timestamps arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleSet {
    width: usize,
    features: Vec<f64>,
    outcomes: Vec<f64>,
    timestamps: Vec<f64>,
}

impl ExampleSet {
    /// An empty set whose rows will have `width` features.
    pub fn new(width: usize) -> Self {
        Self::with_capacity(width, 0)
    }

    pub fn with_capacity(width: usize, rows: usize) -> Self {
        Self {
            width,
            features: Vec::with_capacity(rows * width),
            outcomes: Vec::with_capacity(rows),
            timestamps: Vec::with_capacity(rows),
        }
    }

    /// Build from the three arrays, checking that row counts agree.
    pub fn from_parts(
        width: usize,
        features: Vec<f64>,
        outcomes: Vec<f64>,
        timestamps: Vec<f64>,
    ) -> Result<Self> {
        let rows = outcomes.len();
        if timestamps.len() != rows || features.len() != rows * width {
            return Err(Error::data(format!(
                "misaligned example arrays: {} feature values (width {}), {} outcomes, {} timestamps",
                features.len(),
                width,
                rows,
                timestamps.len()
            )));
        }
        Ok(Self {
            width,
            features,
            outcomes,
            timestamps,
        })
    }

    /// Append one example.
    pub fn push(&mut self, features: &[f64], outcome: f64, timestamp: f64) -> Result<()> {
        if features.len() != self.width {
            return Err(Error::data(format!(
                "example of width {} pushed into set of width {}",
                features.len(),
                self.width
            )));
        }
        self.features.extend_from_slice(features);
        self.outcomes.push(outcome);
        self.timestamps.push(timestamp);
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn outcomes(&self) -> &[f64] {
        &self.outcomes
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn feature_row(&self, row: usize) -> &[f64] {
        &self.features[row * self.width..(row + 1) * self.width]
    }

    /// Copy out one example.
    pub fn get(&self, row: usize) -> Option<TradeExample> {
        if row >= self.len() {
            return None;
        }
        Some(TradeExample {
            features: self.feature_row(row).to_vec(),
            outcome: self.outcomes[row],
            timestamp: self.timestamps[row],
        })
    }

    /// Whether timestamps are non-decreasing.
    pub fn is_time_ordered(&self) -> bool {
        self.timestamps.windows(2).all(|w| w[0] <= w[1])
    }
}
