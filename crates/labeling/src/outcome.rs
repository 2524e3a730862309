//! Forward trade simulation.
//!
//! A long position is opened at the decision bar and held for at most
//! `horizon` bars. Two independent scans look for the first bar whose high
//! reaches the take-profit level and the first bar whose low breaches the
//! stop-loss level. Whichever comes first decides the outcome; if neither
//! fires, or both fire on the same bar, the score is where the exit close
//! falls between the two levels.

use forecast_core::{AggregatedBar, EntryPrice, Error, FeatureMatrix, PriceField, Result};

/// Read-only access to aggregated prices by bar index.
pub trait PriceView {
    /// Number of bars.
    fn len(&self) -> usize;

    /// Price `field` of bar `index`.
    fn price(&self, index: usize, field: PriceField) -> f64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PriceView for [AggregatedBar] {
    fn len(&self) -> usize {
        <[AggregatedBar]>::len(self)
    }

    fn price(&self, index: usize, field: PriceField) -> f64 {
        let bar = &self[index];
        match field {
            PriceField::Close => bar.close,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Open => bar.open,
        }
    }
}

/// Feature rows start with the raw aggregated fields.
impl PriceView for FeatureMatrix {
    fn len(&self) -> usize {
        self.rows()
    }

    fn price(&self, index: usize, field: PriceField) -> f64 {
        self.get(index, field.raw_column())
    }
}

/// How a simulated position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Take-profit level reached before the stop.
    TakeProfit,
    /// Stop-loss level breached before the target.
    StopLoss,
    /// Neither level reached within the horizon.
    TimeExit,
    /// Both levels touched on the same bar.
    SameBar,
}

/// Result of one simulated trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    /// Score in `[0, 1]`: 1 = target hit, 0 = stopped out.
    pub score: f64,
    /// How the position was closed.
    pub kind: ExitKind,
    /// Bar index at which the position was closed.
    pub exit_index: usize,
}

/// Labeling thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelConfig {
    /// Take-profit factor on the entry price (> 1).
    pub gain: f64,
    /// Stop-loss factor on the entry price (in (0, 1)).
    pub loss: f64,
    /// Maximum holding period in bars.
    pub horizon: usize,
    /// Entry reference price.
    pub entry: EntryPrice,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            gain: 1.02,
            loss: 0.99,
            horizon: 195,
            entry: EntryPrice::Open,
        }
    }
}

impl From<&forecast_core::Config> for LabelConfig {
    fn from(config: &forecast_core::Config) -> Self {
        Self {
            gain: config.gain(),
            loss: config.loss(),
            horizon: config.horizon(),
            entry: config.labeling.entry,
        }
    }
}

/// Simulates trades and scores their outcome.
#[derive(Debug, Clone)]
pub struct OutcomeLabeler {
    config: LabelConfig,
}

impl OutcomeLabeler {
    /// Create a labeler; requires `gain > 1 > loss > 0` and `horizon >= 1`.
    pub fn new(config: LabelConfig) -> Result<Self> {
        if !(config.gain > 1.0) {
            return Err(Error::config(format!("gain factor {} must exceed 1", config.gain)));
        }
        if !(config.loss > 0.0 && config.loss < 1.0) {
            return Err(Error::config(format!(
                "loss factor {} must lie in (0, 1)",
                config.loss
            )));
        }
        if config.horizon == 0 {
            return Err(Error::config("horizon must be at least one bar"));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub fn horizon(&self) -> usize {
        self.config.horizon
    }

    /// Simulate a position opened at bar `time`.
    pub fn label<V: PriceView + ?Sized>(&self, prices: &V, time: usize) -> Result<Outcome> {
        let LabelConfig {
            gain,
            loss,
            horizon,
            entry,
        } = self.config;

        if time + horizon > prices.len() {
            return Err(Error::insufficient_data(format!(
                "decision at {} with horizon {} runs past {} bars",
                time,
                horizon,
                prices.len()
            )));
        }

        let reference = match entry {
            EntryPrice::Open => prices.price(time, PriceField::Open),
            EntryPrice::High => prices.price(time, PriceField::High),
        };

        let mut gain_index = time;
        while gain_index - time < horizon
            && prices.price(gain_index, PriceField::High) / reference < gain
        {
            gain_index += 1;
        }

        let mut loss_index = time;
        while loss_index - time < horizon
            && prices.price(loss_index, PriceField::Low) / reference > loss
        {
            loss_index += 1;
        }

        if loss_index > gain_index {
            return Ok(Outcome {
                score: 1.0,
                kind: ExitKind::TakeProfit,
                exit_index: gain_index,
            });
        }
        if loss_index < gain_index {
            return Ok(Outcome {
                score: 0.0,
                kind: ExitKind::StopLoss,
                exit_index: loss_index,
            });
        }

        let (exit_index, kind) = if gain_index - time < horizon {
            (gain_index, ExitKind::SameBar)
        } else {
            (gain_index - 1, ExitKind::TimeExit)
        };
        let relative = prices.price(exit_index, PriceField::Close) / reference;
        let score = (relative - loss) / (gain - loss);
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };

        Ok(Outcome {
            score,
            kind,
            exit_index,
        })
    }
}
