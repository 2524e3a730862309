//! Persistence for feature series and example datasets.
//!
//! This crate provides:
//! - The `FeatureStore` trait with in-memory and SQLite backends
//! - The `DatasetStore` trait for merged example sets and their metadata
//! - Little-endian blob encoding for `f64` arrays

mod blob;
pub mod dataset;
pub mod feature;
pub mod sqlite;

pub use dataset::{DatasetMeta, DatasetStore, MemoryDatasetStore};
pub use feature::{FeatureStore, MemoryFeatureStore, SeriesInfo};
pub use sqlite::{SqliteDatasetStore, SqliteFeatureStore};
