//! End-to-end dataset generation.
//!
//! Two stages, each running one task per symbol on a rayon pool:
//! - `build_features`: raw bars -> aggregated bars -> feature series in a store
//! - `generate_examples`: stored features -> sampled, labeled, merged examples
//!
//! A failing symbol is reported and skipped. Configuration and store
//! mismatches abort before any symbol is processed.

pub mod examples;
pub mod features;
pub mod report;
pub mod seed;

pub use examples::{generate_examples, ExampleRun};
pub use features::{build_features, FeatureRun};
pub use report::SymbolReport;
pub use seed::{symbol_rng, symbol_seed};

use forecast_core::{Error, Result};

/// Build a pool with `workers` threads; zero picks rayon's default.
pub(crate) fn thread_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::Other(format!("failed to start worker pool: {}", e)))
}
