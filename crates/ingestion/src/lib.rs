//! Raw bar ingestion and normalization for the forecasting pipeline.
//!
//! This crate handles:
//! - Trading-day boundary detection
//! - Session-open alignment across daylight-saving offsets
//! - Fixed-grid bar aggregation with gap filling
//! - Raw bar sources (CSV, in-memory)

pub mod aggregator;
pub mod session;
pub mod source;

pub use aggregator::{AggregationStats, BarAggregator, CarryState};
pub use session::{day_segments, day_starts, SessionAligner, DAY_GAP_SECONDS};
pub use source::{BarSource, CsvBarSource, MemoryBarSource};
