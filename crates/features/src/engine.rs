//! Feature computation engine.
//!
//! Combines all feature families into one row per aggregated bar. Column
//! order: the six raw fields, LPR features grouped by price field (close,
//! high, low, open) iterating the LPR strides, SMA ratios iterating the
//! SMA windows, then volume ratios iterating the volume spans.

use crate::{lpr::log_price_relative, moving_average::sma_ratio, volume::volume_ratio};
use forecast_core::{
    AggregatedSeries, Error, FeatureMatrix, FeatureParameters, FeatureSeries, PriceField,
    Result,
};
use tracing::{debug, trace};

/// Feature computation engine.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    params: FeatureParameters,
}

impl FeatureEngine {
    /// Create a new feature engine from validated parameters.
    pub fn new(params: FeatureParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FeatureParameters {
        &self.params
    }

    /// Feature row width produced by this engine.
    pub fn width(&self) -> usize {
        self.params.width()
    }

    /// Compute the feature matrix for an aggregated series.
    pub fn compute(&self, series: &AggregatedSeries) -> Result<FeatureSeries> {
        if series.intervals_per_day != self.params.intervals_per_day() {
            return Err(Error::config(format!(
                "series has {} bars per day but feature parameters expect {}",
                series.intervals_per_day,
                self.params.intervals_per_day()
            )));
        }

        let bars = &series.bars;
        let layout = self.params.layout();
        let mut matrix = FeatureMatrix::zeros(bars.len(), layout.width());

        for (row, bar) in bars.iter().enumerate() {
            for (col, value) in bar.fields().into_iter().enumerate() {
                matrix.set(row, col, value);
            }
        }

        if !bars.is_empty() {
            for field in PriceField::ALL {
                for (k, &stride) in self.params.strides_lpr().iter().enumerate() {
                    let col = layout.lpr_column(field, k);
                    trace!(column = col, field = field.name(), stride, "log price relative");
                    matrix.fill_column(col, &log_price_relative(bars, field, stride));
                }
            }

            for (k, &window) in self.params.strides_sma().iter().enumerate() {
                let col = layout.sma_column(k);
                trace!(column = col, window, "sma ratio");
                matrix.fill_column(col, &sma_ratio(bars, window));
            }

            for (k, &short) in self.params.volume_intervals().iter().enumerate() {
                let col = layout.volume_column(k);
                let long = self.params.long_volume_interval(short);
                trace!(column = col, short, long, "volume ratio");
                matrix.fill_column(col, &volume_ratio(bars, short, long));
            }
        }

        debug!(rows = matrix.rows(), width = matrix.width(), "computed features");

        Ok(FeatureSeries {
            period: series.period,
            intervals_per_day: series.intervals_per_day,
            num_days: series.num_days,
            matrix,
        })
    }
}
