//! Core types and configuration for the OHLCV forecasting pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (raw minute bars, aggregated bars, examples)
//! - Feature parameters and the feature column layout
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod params;
pub mod types;

pub use config::{
    AggregationConfig, Config, FeatureConfig, FeaturePreset, LabelingConfig, PipelineConfig,
    SamplingConfig, WindowSpec,
};
pub use error::{Error, Result};
pub use params::{ColumnLayout, FeatureParameters, PriceField, RAW_FIELDS};
pub use types::*;
