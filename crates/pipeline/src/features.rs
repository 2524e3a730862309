//! Stage one: raw bars to stored feature series.

use crate::report::SymbolReport;
use crate::thread_pool;
use forecast_core::{Config, Error, FeatureParameters, Result};
use forecast_features::FeatureEngine;
use forecast_ingestion::{BarAggregator, BarSource};
use forecast_store::FeatureStore;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Outcome of a feature build.
#[derive(Debug, Clone)]
pub struct FeatureRun {
    /// Parameters written to the store.
    pub params: FeatureParameters,
    /// One report per processed symbol, in symbol order.
    pub reports: Vec<SymbolReport>,
    /// Symbols left untouched because the store already had them.
    pub skipped: Vec<String>,
    /// Stale symbols dropped because the parameters changed and the source
    /// no longer has them.
    pub removed: Vec<String>,
}

impl FeatureRun {
    pub fn failures(&self) -> impl Iterator<Item = &SymbolReport> {
        self.reports.iter().filter(|r| !r.is_ok())
    }
}

/// Aggregate and featurize every symbol of `source` into `store`.
///
/// With `force` unset, a store written with different feature parameters is
/// rejected and symbols already present are skipped when
/// `pipeline.skip_existing` is on. A forced rebuild with new parameters
/// drops stored symbols the source cannot recompute, so every series left in
/// the store matches the parameter record.
pub fn build_features<S, F>(source: &S, store: &F, config: &Config, force: bool) -> Result<FeatureRun>
where
    S: BarSource + ?Sized,
    F: FeatureStore + ?Sized,
{
    config.validate()?;
    let params = config.feature_parameters()?;

    let existing = store.params()?;
    let params_changed = existing.as_ref().is_some_and(|p| *p != params);
    if params_changed && !force {
        return Err(Error::config(
            "feature store was built with different parameters; rebuild with force",
        ));
    }
    let source_symbols = source.symbols()?;

    let mut removed = Vec::new();
    if params_changed {
        for symbol in store.symbols()? {
            if !source_symbols.contains(&symbol) && store.remove(&symbol)? {
                removed.push(symbol);
            }
        }
        if !removed.is_empty() {
            warn!(removed = ?removed, "dropped series built with old parameters");
        }
    }
    store.put_params(&params)?;

    let skip_existing = config.pipeline.skip_existing && !force && !params_changed;
    let mut pending = Vec::new();
    let mut skipped = Vec::new();
    for symbol in source_symbols {
        if skip_existing && store.contains(&symbol)? {
            skipped.push(symbol);
        } else {
            pending.push(symbol);
        }
    }

    let aggregator = BarAggregator::new(config.aggregation.period_minutes)?;
    let engine = FeatureEngine::new(params.clone());

    info!(
        symbols = pending.len(),
        skipped = skipped.len(),
        period = aggregator.period(),
        width = engine.width(),
        "building features"
    );

    let pool = thread_pool(config.pipeline.workers)?;
    let reports: Vec<SymbolReport> = pool.install(|| {
        pending
            .par_iter()
            .map(|symbol| match featurize(source, store, &aggregator, &engine, symbol) {
                Ok(rows) => SymbolReport::ok(symbol.as_str(), rows),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "feature build failed");
                    SymbolReport::failed(symbol.as_str(), &e)
                }
            })
            .collect()
    });

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    info!(
        built = reports.len() - failed,
        failed,
        skipped = skipped.len(),
        removed = removed.len(),
        "feature build finished"
    );

    Ok(FeatureRun {
        params,
        reports,
        skipped,
        removed,
    })
}

fn featurize<S, F>(
    source: &S,
    store: &F,
    aggregator: &BarAggregator,
    engine: &FeatureEngine,
    symbol: &str,
) -> Result<usize>
where
    S: BarSource + ?Sized,
    F: FeatureStore + ?Sized,
{
    let raw = source.load(symbol)?;
    let (series, stats) = aggregator.aggregate_with_stats(&raw);
    if stats.skipped_raw > 0 {
        warn!(symbol, skipped = stats.skipped_raw, "raw bars outside session windows");
    }
    let features = engine.compute(&series)?;
    store.put_series(symbol, &features)?;

    debug!(
        symbol,
        raw = raw.len(),
        days = stats.days,
        bars = features.len(),
        filled = stats.filled_bars,
        "featurized"
    );
    Ok(features.len())
}
