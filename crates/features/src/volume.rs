//! Smoothed volume ratios.
//!
//! Two exponential filters, both seeded at the first bar's volume, follow
//! volume over a short and a long span. The feature is their ratio with a
//! `+1` in the denominator so runs of zero volume stay finite.

use forecast_core::AggregatedBar;

/// Exponential filter `value += (x - value) / span`.
#[derive(Debug, Clone, Copy)]
pub struct EmaFilter {
    alpha: f64,
    value: f64,
}

impl EmaFilter {
    /// Create a filter with the given span, seeded at `seed`.
    pub fn new(span: usize, seed: f64) -> Self {
        Self {
            alpha: 1.0 / span.max(1) as f64,
            value: seed,
        }
    }

    /// Fold in one observation and return the updated value.
    #[inline]
    pub fn update(&mut self, x: f64) -> f64 {
        self.value += self.alpha * (x - self.value);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// `short_ema / (long_ema + 1)` of volume for every bar.
pub fn volume_ratio(bars: &[AggregatedBar], short_span: usize, long_span: usize) -> Vec<f64> {
    let Some(first) = bars.first() else {
        return Vec::new();
    };
    let mut short = EmaFilter::new(short_span, first.volume);
    let mut long = EmaFilter::new(long_span, first.volume);

    bars.iter()
        .map(|bar| {
            let s = short.update(bar.volume);
            let l = long.update(bar.volume);
            s / (l + 1.0)
        })
        .collect()
}
