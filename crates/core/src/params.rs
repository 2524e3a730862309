//! Feature parameters and the feature column layout they imply.
//!
//! Stride lists are data rather than code: they are derived from the
//! number of bars per day by a preset, validated once, and persisted next
//! to every feature store and example dataset so that consumers can map
//! column indices back to meaning.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of raw aggregated fields at the start of every feature row.
pub const RAW_FIELDS: usize = 6;

/// Price fields that get log-price-relative features, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceField {
    Close,
    High,
    Low,
    Open,
}

impl PriceField {
    /// All fields in LPR group order.
    pub const ALL: [PriceField; 4] = [
        PriceField::Close,
        PriceField::High,
        PriceField::Low,
        PriceField::Open,
    ];

    /// Column of this field among the raw fields.
    pub fn raw_column(self) -> usize {
        match self {
            PriceField::Close => 1,
            PriceField::High => 2,
            PriceField::Low => 3,
            PriceField::Open => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PriceField::Close => "close",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Open => "open",
        }
    }
}

/// Stride and window configuration for feature generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureParameters {
    intervals_per_day: usize,
    strides_lpr: Vec<usize>,
    strides_sma: Vec<usize>,
    volume_intervals: Vec<usize>,
}

impl FeatureParameters {
    /// Build and validate a parameter set.
    pub fn new(
        intervals_per_day: usize,
        strides_lpr: Vec<usize>,
        strides_sma: Vec<usize>,
        volume_intervals: Vec<usize>,
    ) -> Result<Self> {
        let params = Self {
            intervals_per_day,
            strides_lpr,
            strides_sma,
            volume_intervals,
        };
        params.validate()?;
        Ok(params)
    }

    /// Small preset: intraday strides plus one day.
    pub fn basic(intervals_per_day: usize) -> Result<Self> {
        let d = intervals_per_day;
        Self::new(d, vec![1, 2, 5, 10, 20, d], vec![10, 20, 20 * d], vec![10, 20, d])
    }

    /// Production preset reaching back up to a hundred days.
    pub fn extended(intervals_per_day: usize) -> Result<Self> {
        let d = intervals_per_day;
        Self::new(
            d,
            vec![1, 2, 5, 10, 30, 60, d, 2 * d, 5 * d, 10 * d],
            vec![10, 20, d, 2 * d, 5 * d, 10 * d, 20 * d, 50 * d, 100 * d],
            vec![10, 20, d, 5 * d, 20 * d],
        )
    }

    /// Check the invariants every constructor must uphold.
    pub fn validate(&self) -> Result<()> {
        if self.intervals_per_day == 0 {
            return Err(Error::config("intervals_per_day must be at least 1"));
        }
        for (name, list) in [
            ("strides_lpr", &self.strides_lpr),
            ("strides_sma", &self.strides_sma),
            ("volume_intervals", &self.volume_intervals),
        ] {
            if list.is_empty() {
                return Err(Error::config(format!("{} must not be empty", name)));
            }
            if list.contains(&0) {
                return Err(Error::config(format!("{} entries must be at least 1", name)));
            }
        }
        Ok(())
    }

    pub fn intervals_per_day(&self) -> usize {
        self.intervals_per_day
    }

    pub fn strides_lpr(&self) -> &[usize] {
        &self.strides_lpr
    }

    pub fn strides_sma(&self) -> &[usize] {
        &self.strides_sma
    }

    pub fn volume_intervals(&self) -> &[usize] {
        &self.volume_intervals
    }

    /// Long EMA span paired with a short volume span.
    pub fn long_volume_interval(&self, short: usize) -> usize {
        (10 * short).max(20 * self.intervals_per_day)
    }

    /// Total feature row width.
    pub fn width(&self) -> usize {
        self.layout().width()
    }

    pub fn layout(&self) -> ColumnLayout {
        ColumnLayout {
            num_lpr: self.strides_lpr.len(),
            num_sma: self.strides_sma.len(),
            num_volume: self.volume_intervals.len(),
        }
    }
}

/// Offsets of each feature family within a feature row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    num_lpr: usize,
    num_sma: usize,
    num_volume: usize,
}

impl ColumnLayout {
    pub fn lpr_start(&self) -> usize {
        RAW_FIELDS
    }

    /// Column of the LPR feature for `field` at stride index `stride`.
    pub fn lpr_column(&self, field: PriceField, stride: usize) -> usize {
        let group = PriceField::ALL
            .iter()
            .position(|f| *f == field)
            .unwrap_or_default();
        self.lpr_start() + group * self.num_lpr + stride
    }

    pub fn sma_start(&self) -> usize {
        self.lpr_start() + 4 * self.num_lpr
    }

    pub fn sma_column(&self, stride: usize) -> usize {
        self.sma_start() + stride
    }

    pub fn volume_start(&self) -> usize {
        self.sma_start() + self.num_sma
    }

    pub fn volume_column(&self, interval: usize) -> usize {
        self.volume_start() + interval
    }

    pub fn num_lpr(&self) -> usize {
        self.num_lpr
    }

    pub fn num_sma(&self) -> usize {
        self.num_sma
    }

    pub fn num_volume(&self) -> usize {
        self.num_volume
    }

    pub fn width(&self) -> usize {
        self.volume_start() + self.num_volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_width() {
        let params = FeatureParameters::extended(195).unwrap();
        // 6 + 4*10 + 9 + 5
        assert_eq!(params.width(), 60);
        assert_eq!(params.strides_sma()[6], 20 * 195);
    }

    #[test]
    fn test_basic_width() {
        let params = FeatureParameters::basic(195).unwrap();
        assert_eq!(params.width(), 6 + 24 + 3 + 3);
    }

    #[test]
    fn test_layout_offsets() {
        let params = FeatureParameters::new(10, vec![1, 2], vec![3], vec![4, 5]).unwrap();
        let layout = params.layout();
        assert_eq!(layout.lpr_column(PriceField::Close, 0), 6);
        assert_eq!(layout.lpr_column(PriceField::High, 1), 9);
        assert_eq!(layout.lpr_column(PriceField::Open, 1), 13);
        assert_eq!(layout.sma_column(0), 14);
        assert_eq!(layout.volume_column(1), 16);
        assert_eq!(layout.width(), 17);
    }

    #[test]
    fn test_long_volume_interval() {
        let params = FeatureParameters::basic(195).unwrap();
        assert_eq!(params.long_volume_interval(10), 3900);
        assert_eq!(params.long_volume_interval(1000), 10_000);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(FeatureParameters::new(0, vec![1], vec![1], vec![1]).is_err());
        assert!(FeatureParameters::new(10, vec![], vec![1], vec![1]).is_err());
        assert!(FeatureParameters::new(10, vec![1], vec![0], vec![1]).is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_values() {
        let params = FeatureParameters::extended(56).unwrap();
        let json = serde_json::to_string(&params).unwrap();
        let back: FeatureParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
