//! Example generation for the forecasting pipeline.
//!
//! This crate provides:
//! - Forward trade simulation (take-profit / stop-loss / time exit)
//! - Randomized decision sampling with lookback feature windows
//! - Global time ordering of examples across symbols

pub mod merger;
pub mod outcome;
pub mod sampler;

pub use merger::{merge, ExampleMerger};
pub use outcome::{ExitKind, LabelConfig, Outcome, OutcomeLabeler, PriceView};
pub use sampler::ExampleSampler;
