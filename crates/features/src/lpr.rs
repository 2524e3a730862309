//! Log price relatives.
//!
//! For stride `s` the reference is the close `s` bars back, clamped to the
//! first bar. Close and open compare the current bar's price directly;
//! high and low use the extreme over the trailing `s` bars, which measures
//! the excursion since the reference close.

use forecast_core::{AggregatedBar, PriceField};
use std::collections::VecDeque;

/// Which extreme a [`RollingExtreme`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

/// Sliding-window max or min using a monotonic deque.
pub struct RollingExtreme {
    /// Window size in bars.
    window: usize,
    extreme: Extreme,
    /// Candidate (index, value) pairs, best first.
    candidates: VecDeque<(usize, f64)>,
    /// Index of the next value to be pushed.
    next_index: usize,
}

impl RollingExtreme {
    pub fn new(window: usize, extreme: Extreme) -> Self {
        Self {
            window: window.max(1),
            extreme,
            candidates: VecDeque::with_capacity(window.min(4096)),
            next_index: 0,
        }
    }

    fn dominates(&self, new: f64, old: f64) -> bool {
        match self.extreme {
            Extreme::Max => new >= old,
            Extreme::Min => new <= old,
        }
    }

    /// Add a value and return the extreme over the last `window` values.
    pub fn push(&mut self, value: f64) -> f64 {
        let index = self.next_index;
        self.next_index += 1;

        while let Some(&(_, back)) = self.candidates.back() {
            if self.dominates(value, back) {
                self.candidates.pop_back();
            } else {
                break;
            }
        }
        self.candidates.push_back((index, value));

        // Drop candidates that slid out of the window.
        while let Some(&(front, _)) = self.candidates.front() {
            if front + self.window <= index {
                self.candidates.pop_front();
            } else {
                break;
            }
        }

        self.candidates.front().map(|(_, v)| *v).unwrap_or(value)
    }
}

/// Log price relative of `field` at `stride` for every bar.
pub fn log_price_relative(bars: &[AggregatedBar], field: PriceField, stride: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut extreme = match field {
        PriceField::High => Some(RollingExtreme::new(stride, Extreme::Max)),
        PriceField::Low => Some(RollingExtreme::new(stride, Extreme::Min)),
        PriceField::Close | PriceField::Open => None,
    };

    for (i, bar) in bars.iter().enumerate() {
        let reference = bars[i.saturating_sub(stride)].close;
        let numerator = match (field, extreme.as_mut()) {
            (PriceField::High, Some(window)) => window.push(bar.high),
            (PriceField::Low, Some(window)) => window.push(bar.low),
            (PriceField::Open, _) => bar.open,
            _ => bar.close,
        };
        out.push((numerator / reference).ln());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bar(close: f64, high: f64, low: f64, open: f64) -> AggregatedBar {
        AggregatedBar {
            day_offset: 0.0,
            close,
            high,
            low,
            open,
            volume: 1.0,
        }
    }

    fn bars() -> Vec<AggregatedBar> {
        vec![
            bar(10.0, 11.0, 9.0, 10.0),
            bar(12.0, 13.0, 10.0, 11.0),
            bar(11.0, 12.0, 8.0, 12.0),
            bar(15.0, 15.5, 11.0, 11.5),
        ]
    }

    #[test]
    fn test_rolling_max_window() {
        let mut max = RollingExtreme::new(3, Extreme::Max);
        let out: Vec<f64> = [1.0, 5.0, 2.0, 3.0, 1.0, 0.5]
            .iter()
            .map(|v| max.push(*v))
            .collect();
        assert_eq!(out, vec![1.0, 5.0, 5.0, 5.0, 3.0, 3.0]);
    }

    #[test]
    fn test_rolling_min_window() {
        let mut min = RollingExtreme::new(2, Extreme::Min);
        let out: Vec<f64> = [4.0, 2.0, 3.0, 5.0, 1.0]
            .iter()
            .map(|v| min.push(*v))
            .collect();
        assert_eq!(out, vec![4.0, 2.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_close_lpr_is_zero_at_start() {
        let lpr = log_price_relative(&bars(), PriceField::Close, 5);
        assert_eq!(lpr[0], 0.0);
        // Clamped reference: every bar compares with the first close.
        assert_relative_eq!(lpr[3], (15.0f64 / 10.0).ln());
    }

    #[test]
    fn test_close_and_open_lpr() {
        let b = bars();
        let close = log_price_relative(&b, PriceField::Close, 1);
        let open = log_price_relative(&b, PriceField::Open, 2);
        assert_relative_eq!(close[2], (11.0f64 / 12.0).ln());
        assert_relative_eq!(open[3], (11.5f64 / 12.0).ln());
        assert_relative_eq!(open[1], (11.0f64 / 10.0).ln());
    }

    #[test]
    fn test_high_low_use_trailing_extremes() {
        let b = bars();
        let high = log_price_relative(&b, PriceField::High, 2);
        let low = log_price_relative(&b, PriceField::Low, 2);
        // i=2: max(high[1..=2]) = 13, reference close[0] = 10
        assert_relative_eq!(high[2], (13.0f64 / 10.0).ln());
        // i=3: min(low[2..=3]) = 8, reference close[1] = 12
        assert_relative_eq!(low[3], (8.0f64 / 12.0).ln());
        // i=0: only bar 0 in the window
        assert_relative_eq!(high[0], (11.0f64 / 10.0).ln());
    }

    #[test]
    fn test_stride_one_high_is_current_bar() {
        let b = bars();
        let high = log_price_relative(&b, PriceField::High, 1);
        for i in 1..b.len() {
            assert_relative_eq!(high[i], (b[i].high / b[i - 1].close).ln());
        }
    }
}
