//! Stage two: stored feature series to one merged example set.

use crate::report::SymbolReport;
use crate::seed::symbol_rng;
use crate::thread_pool;
use forecast_core::{Config, Error, ExampleSet, Result};
use forecast_labeling::{ExampleMerger, ExampleSampler, LabelConfig, OutcomeLabeler};
use forecast_store::{DatasetMeta, FeatureStore};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Outcome of example generation.
#[derive(Debug, Clone)]
pub struct ExampleRun {
    /// Time-ordered examples of every successful symbol.
    pub examples: ExampleSet,
    /// Column and label semantics of `examples`.
    pub meta: DatasetMeta,
    /// One report per requested symbol, in symbol order.
    pub reports: Vec<SymbolReport>,
}

/// Sample, label and merge examples for `symbols` (all stored symbols when
/// `None`).
pub fn generate_examples<F>(
    store: &F,
    symbols: Option<&[String]>,
    config: &Config,
) -> Result<ExampleRun>
where
    F: FeatureStore + ?Sized,
{
    config.validate()?;
    let params = store
        .params()?
        .ok_or_else(|| Error::config("feature store has no feature parameter record"))?;
    if params.intervals_per_day() != config.intervals_per_day() {
        return Err(Error::config(format!(
            "feature store holds {} bars per day but the configured period gives {}",
            params.intervals_per_day(),
            config.intervals_per_day()
        )));
    }

    let sampler = ExampleSampler::new(
        params.clone(),
        config.sampling.window.clone(),
        config.horizon(),
    )?;
    let label_config = LabelConfig::from(config);
    let labeler = OutcomeLabeler::new(label_config)?;

    let info = store.info()?;
    let symbols: Vec<String> = match symbols {
        Some(list) => list.to_vec(),
        None => info.iter().map(|i| i.symbol.clone()).collect(),
    };

    // Series must match the parameter record and the configured grid; a
    // requested symbol the store lacks fails on its own below.
    let period = config.aggregation.period_minutes;
    for series in info.iter().filter(|i| symbols.contains(&i.symbol)) {
        if series.width != params.width() {
            return Err(Error::config(format!(
                "stored series {} has width {} but parameters give {}",
                series.symbol,
                series.width,
                params.width()
            )));
        }
        if series.intervals_per_day != params.intervals_per_day() {
            return Err(Error::config(format!(
                "stored series {} has {} bars per day but parameters give {}",
                series.symbol,
                series.intervals_per_day,
                params.intervals_per_day()
            )));
        }
        if series.period != period {
            return Err(Error::config(format!(
                "stored series {} was aggregated at {} minutes but the configured period is {}",
                series.symbol, series.period, period
            )));
        }
    }

    info!(
        symbols = symbols.len(),
        horizon = labeler.horizon(),
        width = sampler.width(),
        seed = config.sampling.seed,
        "generating examples"
    );

    let pool = thread_pool(config.pipeline.workers)?;
    let results: Vec<(SymbolReport, Option<ExampleSet>)> = pool.install(|| {
        symbols
            .par_iter()
            .map(|symbol| {
                let mut rng = symbol_rng(config.sampling.seed, symbol);
                let sampled = store
                    .series(symbol)
                    .and_then(|series| sampler.sample(&series, &labeler, &mut rng));
                match sampled {
                    Ok(set) => {
                        debug!(symbol = %symbol, examples = set.len(), "sampled");
                        (SymbolReport::ok(symbol.as_str(), set.len()), Some(set))
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "example generation failed");
                        (SymbolReport::failed(symbol.as_str(), &e), None)
                    }
                }
            })
            .collect()
    });

    let mut merger = ExampleMerger::new(sampler.width());
    let mut reports = Vec::with_capacity(results.len());
    let mut contributors = Vec::new();
    for (report, set) in results {
        if let Some(set) = set {
            if !set.is_empty() {
                contributors.push(report.symbol.clone());
            }
            merger.add(set)?;
        }
        reports.push(report);
    }
    let examples = merger.finish()?;

    let meta = DatasetMeta {
        gain: label_config.gain,
        loss: label_config.loss,
        horizon: label_config.horizon,
        entry: label_config.entry,
        params,
        window: config.sampling.window.clone(),
        symbols: contributors,
    };

    Ok(ExampleRun {
        examples,
        meta,
        reports,
    })
}
