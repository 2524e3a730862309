//! Close price relative to a simple moving average.
//!
//! The window grows from the first bar until it holds `window` closes and
//! then slides. The divisor is always the number of closes actually in the
//! window, so early values are exact means over a shorter history.

use forecast_core::AggregatedBar;
use std::collections::VecDeque;

/// Running simple moving average over the last `window` values.
pub struct RollingMean {
    /// Window size in periods.
    window: usize,
    /// Values currently in the window.
    values: VecDeque<f64>,
    /// Running sum of the window.
    sum: f64,
}

impl RollingMean {
    /// Create a new rolling mean. A zero window is treated as one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window.min(1 << 16)),
            sum: 0.0,
        }
    }

    /// Add a value and return the mean of the current window.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.values.len() >= self.window {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
        self.mean()
    }

    /// Mean of the values in the window.
    pub fn mean(&self) -> f64 {
        self.sum / self.values.len().max(1) as f64
    }

    /// Number of values in the window, never more than the window size.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Whether the window is full.
    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.window
    }
}

/// `ln(close / SMA(close, window))` for every bar.
pub fn sma_ratio(bars: &[AggregatedBar], window: usize) -> Vec<f64> {
    let mut mean = RollingMean::new(window);
    bars.iter()
        .map(|bar| (bar.close / mean.push(bar.close)).ln())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn closes(values: &[f64]) -> Vec<AggregatedBar> {
        values
            .iter()
            .map(|&c| AggregatedBar::flat(0.0, c))
            .collect()
    }

    #[test]
    fn test_window_grows_then_slides() {
        let mut mean = RollingMean::new(3);
        assert_relative_eq!(mean.push(3.0), 3.0);
        assert_relative_eq!(mean.push(6.0), 4.5);
        assert!(!mean.is_ready());
        assert_relative_eq!(mean.push(9.0), 6.0);
        assert!(mean.is_ready());
        assert_relative_eq!(mean.push(12.0), 9.0);
        assert_eq!(mean.count(), 3);
    }

    #[test]
    fn test_first_ratio_is_zero() {
        let ratio = sma_ratio(&closes(&[50.0, 55.0]), 10);
        assert_eq!(ratio[0], 0.0);
        assert_relative_eq!(ratio[1], (55.0f64 / 52.5).ln());
    }

    #[test]
    fn test_matches_arithmetic_mean() {
        let values = [10.0, 11.0, 10.5, 12.0, 13.0, 12.5, 11.0];
        let ratio = sma_ratio(&closes(&values), 4);
        for i in 3..values.len() {
            let mean: f64 = values[i - 3..=i].iter().sum::<f64>() / 4.0;
            assert_relative_eq!(ratio[i], (values[i] / mean).ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_prices_give_zero() {
        let ratio = sma_ratio(&closes(&[7.0; 20]), 5);
        assert!(ratio.iter().all(|r| r.abs() < 1e-15));
    }
}
