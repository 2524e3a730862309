//! Decision sampling and lookback window extraction.
//!
//! Decision bars are spaced by a random step of less than one trading day so
//! successive examples from one symbol do not share the same time of day.
//! Each example carries a strided history of selected feature columns that
//! ends just before the decision bar.

use crate::outcome::OutcomeLabeler;
use forecast_core::{
    ColumnLayout, Error, ExampleSet, FeatureMatrix, FeatureParameters, FeatureSeries, PriceField,
    Result, WindowSpec,
};
use rand::Rng;
use tracing::debug;

/// Draws decision bars from a feature series and builds labeled examples.
#[derive(Debug, Clone)]
pub struct ExampleSampler {
    params: FeatureParameters,
    layout: ColumnLayout,
    window: WindowSpec,
    horizon: usize,
    stride: usize,
}

impl ExampleSampler {
    /// Create a sampler; fails if the window references a missing column.
    pub fn new(params: FeatureParameters, window: WindowSpec, horizon: usize) -> Result<Self> {
        window.validate(&params)?;
        if horizon == 0 {
            return Err(Error::config("horizon must be at least one bar"));
        }
        let stride = params.strides_lpr()[window.lpr_stride];
        let layout = params.layout();
        Ok(Self {
            params,
            layout,
            window,
            horizon,
            stride,
        })
    }

    pub fn window(&self) -> &WindowSpec {
        &self.window
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Example row width.
    pub fn width(&self) -> usize {
        self.window.width()
    }

    /// First bar with a complete lookback history.
    pub fn min_lookback(&self) -> usize {
        self.stride * self.window.samples
    }

    /// Decision indices for a series of `len` bars, ascending.
    pub fn decision_indices<R: Rng + ?Sized>(&self, len: usize, rng: &mut R) -> Vec<usize> {
        let start = self.min_lookback();
        let end = len.saturating_sub(self.horizon);
        let upper = self.params.intervals_per_day().max(2);

        let mut indices = Vec::new();
        let mut t = start;
        while t < end {
            indices.push(t);
            t += rng.gen_range(1..upper);
        }
        indices
    }

    /// Feature window for decision bar `time`.
    ///
    /// `time` must be at least [`min_lookback`](Self::min_lookback).
    pub fn extract(&self, features: &FeatureMatrix, time: usize) -> Vec<f64> {
        let ipd = self.params.intervals_per_day();
        let rows: Vec<usize> = (1..=self.window.samples)
            .rev()
            .map(|k| time - k * self.stride)
            .collect();

        let lpr_columns = PriceField::ALL
            .iter()
            .map(|&field| self.layout.lpr_column(field, self.window.lpr_stride));
        let sma_columns = self
            .window
            .sma_columns
            .iter()
            .map(|&k| self.layout.sma_column(k));
        let volume_columns = self
            .window
            .volume_columns
            .iter()
            .map(|&k| self.layout.volume_column(k));

        let mut out = Vec::with_capacity(self.width());
        out.push((time % ipd) as f64 / ipd as f64);
        for col in lpr_columns.chain(sma_columns).chain(volume_columns) {
            out.extend(rows.iter().map(|&row| features.get(row, col)));
        }
        out
    }

    /// Sample, window and label one symbol's feature series.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        series: &FeatureSeries,
        labeler: &OutcomeLabeler,
        rng: &mut R,
    ) -> Result<ExampleSet> {
        if series.width() != self.params.width() {
            return Err(Error::config(format!(
                "feature rows have width {} but parameters produce {}",
                series.width(),
                self.params.width()
            )));
        }
        if series.intervals_per_day != self.params.intervals_per_day() {
            return Err(Error::config(format!(
                "feature series has {} bars per day but parameters expect {}",
                series.intervals_per_day,
                self.params.intervals_per_day()
            )));
        }

        let indices = self.decision_indices(series.len(), rng);
        let mut set = ExampleSet::with_capacity(self.width(), indices.len());
        for &t in &indices {
            let outcome = labeler.label(&series.matrix, t)?;
            let window = self.extract(&series.matrix, t);
            set.push(&window, outcome.score, series.matrix.get(t, 0))?;
        }

        debug!(
            bars = series.len(),
            examples = set.len(),
            min_lookback = self.min_lookback(),
            "sampled examples"
        );
        Ok(set)
    }
}
