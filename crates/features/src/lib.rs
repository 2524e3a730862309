//! Feature computation for the forecasting pipeline.
//!
//! This crate handles:
//! - Log price relatives at multiple strides (close, high, low, open)
//! - Close price relative to simple moving averages
//! - Short/long smoothed volume ratios
//! - Assembling all families into one causal feature matrix

pub mod engine;
pub mod lpr;
pub mod moving_average;
pub mod volume;

pub use engine::FeatureEngine;
pub use lpr::{log_price_relative, RollingExtreme};
pub use moving_average::{sma_ratio, RollingMean};
pub use volume::{volume_ratio, EmaFilter};
