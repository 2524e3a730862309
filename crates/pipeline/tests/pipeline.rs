//! End-to-end runs over synthetic minute data.

use forecast_core::{
    Config, Error, FeatureMatrix, FeatureSeries, RawBar, SECONDS_PER_DAY, TIME_REFERENCE,
};
use forecast_ingestion::MemoryBarSource;
use forecast_pipeline::{build_features, generate_examples};
use forecast_store::{FeatureStore, MemoryFeatureStore, SqliteFeatureStore};

const DAYS: usize = 6;

/// One full session per day of wavy one-minute bars.
fn minute_bars(days: usize, base: f64) -> Vec<RawBar> {
    let mut bars = Vec::with_capacity(days * 390);
    for day in 0..days {
        let open = TIME_REFERENCE + day as f64 * SECONDS_PER_DAY + 9.5 * 3600.0;
        for i in 0..390 {
            let n = (day * 390 + i) as f64;
            let price = base + 2.0 * (n / 37.0).sin() + 0.5 * (n / 5.0).cos();
            let close = price + 0.1 * (n / 3.0).sin();
            bars.push(RawBar {
                time: open + 60.0 * (i + 1) as f64,
                close,
                high: price.max(close) + 0.2,
                low: price.min(close) - 0.2,
                open: price,
                volume: 100.0 + (i % 17) as f64,
            });
        }
    }
    bars
}

fn source() -> MemoryBarSource {
    MemoryBarSource::new()
        .with("AAA", minute_bars(DAYS, 50.0))
        .with("BBB", minute_bars(DAYS, 80.0))
        .with("CCC", minute_bars(DAYS - 2, 20.0))
}

fn config() -> Config {
    let mut config = Config::default();
    config.aggregation.period_minutes = 30;
    config.sampling.window.samples = 10;
    config.sampling.seed = 11;
    config
}

#[test]
fn test_features_then_examples() {
    let store = MemoryFeatureStore::new();
    let config = config();

    let run = build_features(&source(), &store, &config, false).unwrap();
    assert_eq!(run.reports.len(), 3);
    assert!(run.reports.iter().all(|r| r.is_ok()));
    assert_eq!(run.reports[0].rows, DAYS * 13);
    assert_eq!(store.symbols().unwrap(), vec!["AAA", "BBB", "CCC"]);
    assert_eq!(store.params().unwrap(), Some(run.params.clone()));

    let examples = generate_examples(&store, None, &config).unwrap();
    let total: usize = examples.reports.iter().map(|r| r.rows).sum();
    assert!(total > 0);
    assert_eq!(examples.examples.len(), total);
    assert_eq!(examples.examples.width(), config.sampling.window.width());
    assert!(examples.examples.is_time_ordered());
    assert!(examples
        .examples
        .outcomes()
        .iter()
        .all(|o| (0.0..=1.0).contains(o)));
    assert_eq!(examples.meta.symbols, vec!["AAA", "BBB", "CCC"]);
    assert_eq!(examples.meta.horizon, 13);
}

#[test]
fn test_worker_count_does_not_change_output() {
    let store = MemoryFeatureStore::new();
    let mut config = config();
    build_features(&source(), &store, &config, false).unwrap();

    config.pipeline.workers = 1;
    let serial = generate_examples(&store, None, &config).unwrap();
    config.pipeline.workers = 4;
    let parallel = generate_examples(&store, None, &config).unwrap();
    assert_eq!(serial.examples, parallel.examples);

    config.sampling.seed = 12;
    let reseeded = generate_examples(&store, None, &config).unwrap();
    assert_ne!(serial.examples.timestamps(), reseeded.examples.timestamps());
}

#[test]
fn test_existing_symbols_are_skipped_unless_forced() {
    let store = MemoryFeatureStore::new();
    let config = config();
    build_features(&source(), &store, &config, false).unwrap();

    let again = build_features(&source(), &store, &config, false).unwrap();
    assert!(again.reports.is_empty());
    assert_eq!(again.skipped, vec!["AAA", "BBB", "CCC"]);

    let forced = build_features(&source(), &store, &config, true).unwrap();
    assert_eq!(forced.reports.len(), 3);
    assert!(forced.skipped.is_empty());
}

#[test]
fn test_changed_parameters_need_force() {
    let store = MemoryFeatureStore::new();
    let mut config = config();
    build_features(&source(), &store, &config, false).unwrap();

    config.features.strides_lpr = Some(vec![1, 3]);
    let err = build_features(&source(), &store, &config, false).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let run = build_features(&source(), &store, &config, true).unwrap();
    assert_eq!(run.reports.len(), 3);
    assert!(run.removed.is_empty());
    assert_eq!(store.params().unwrap(), Some(run.params));
}

#[test]
fn test_forced_rebuild_drops_symbols_missing_from_source() {
    let store = MemoryFeatureStore::new();
    let mut config = config();
    let both = MemoryBarSource::new()
        .with("AAA", minute_bars(DAYS, 50.0))
        .with("OLD", minute_bars(DAYS, 70.0));
    build_features(&both, &store, &config, false).unwrap();

    config.features.strides_lpr = Some(vec![1, 3]);
    let only_aaa = MemoryBarSource::new().with("AAA", minute_bars(DAYS, 50.0));
    let run = build_features(&only_aaa, &store, &config, true).unwrap();
    assert_eq!(run.removed, vec!["OLD"]);
    assert_eq!(store.symbols().unwrap(), vec!["AAA"]);

    let wanted = vec!["AAA".to_string()];
    let examples = generate_examples(&store, Some(&wanted), &config).unwrap();
    assert!(examples.reports[0].is_ok());
    assert_eq!(examples.examples.width(), config.sampling.window.width());
}

#[test]
fn test_forced_rebuild_with_same_parameters_keeps_other_symbols() {
    let store = MemoryFeatureStore::new();
    let config = config();
    build_features(&source(), &store, &config, false).unwrap();

    let only_aaa = MemoryBarSource::new().with("AAA", minute_bars(DAYS, 50.0));
    let run = build_features(&only_aaa, &store, &config, true).unwrap();
    assert!(run.removed.is_empty());
    assert_eq!(store.symbols().unwrap(), vec!["AAA", "BBB", "CCC"]);
}

#[test]
fn test_bad_symbol_is_isolated() {
    let mut broken = minute_bars(DAYS, 40.0);
    broken[100].low = -1.0;
    let source = source().with("BAD", broken);
    let store = MemoryFeatureStore::new();
    let config = config();

    let run = build_features(&source, &store, &config, false).unwrap();
    assert_eq!(run.failures().count(), 1);
    assert_eq!(run.failures().next().unwrap().symbol, "BAD");
    assert!(!store.contains("BAD").unwrap());

    let wanted = vec!["AAA".to_string(), "BAD".to_string()];
    let examples = generate_examples(&store, Some(&wanted), &config).unwrap();
    assert!(examples.reports[0].is_ok());
    assert!(!examples.reports[1].is_ok());
    assert_eq!(examples.examples.len(), examples.reports[0].rows);
    assert_eq!(examples.meta.symbols, vec!["AAA"]);
}

#[test]
fn test_store_without_params_is_fatal() {
    let store = MemoryFeatureStore::new();
    let err = generate_examples(&store, None, &config()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_window_outside_parameters_is_fatal() {
    let store = MemoryFeatureStore::new();
    let mut config = config();
    build_features(&source(), &store, &config, false).unwrap();

    config.sampling.window.sma_columns = vec![0, 40];
    let err = generate_examples(&store, None, &config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_stored_width_mismatch_is_fatal() {
    let store = MemoryFeatureStore::new();
    let config = config();
    build_features(&source(), &store, &config, false).unwrap();

    let stray = FeatureSeries {
        period: 30,
        intervals_per_day: 13,
        num_days: 1,
        matrix: FeatureMatrix::zeros(13, 5),
    };
    store.put_series("ODD", &stray).unwrap();
    let err = generate_examples(&store, None, &config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    // Only requested symbols are checked.
    let wanted = vec!["AAA".to_string()];
    let run = generate_examples(&store, Some(&wanted), &config).unwrap();
    assert!(run.reports[0].is_ok());
    assert_eq!(run.meta.symbols, vec!["AAA"]);
}

fn stored_params_width(store: &MemoryFeatureStore) -> usize {
    store.params().unwrap().unwrap().width()
}

#[test]
fn test_stored_grid_mismatch_is_fatal() {
    let store = MemoryFeatureStore::new();
    let config = config();
    build_features(&source(), &store, &config, false).unwrap();
    let width = stored_params_width(&store);
    let wanted = vec!["AAA".to_string(), "ODD".to_string()];

    // 31-minute bars also give 13 bars per session.
    let other_period = FeatureSeries {
        period: 31,
        intervals_per_day: 13,
        num_days: 1,
        matrix: FeatureMatrix::zeros(13, width),
    };
    store.put_series("ODD", &other_period).unwrap();
    let err = generate_examples(&store, Some(&wanted), &config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let other_grid = FeatureSeries {
        period: 30,
        intervals_per_day: 12,
        num_days: 1,
        matrix: FeatureMatrix::zeros(12, width),
    };
    store.put_series("ODD", &other_grid).unwrap();
    let err = generate_examples(&store, Some(&wanted), &config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_period_mismatch_is_fatal() {
    let store = MemoryFeatureStore::new();
    let mut config = config();
    build_features(&source(), &store, &config, false).unwrap();

    config.aggregation.period_minutes = 15;
    let err = generate_examples(&store, None, &config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_symbol_without_bars_yields_no_examples() {
    let source = source().with("EMPTY", Vec::new());
    let store = SqliteFeatureStore::open_in_memory().unwrap();
    let config = config();

    let run = build_features(&source, &store, &config, false).unwrap();
    let empty = run.reports.iter().find(|r| r.symbol == "EMPTY").unwrap();
    assert!(empty.is_ok());
    assert_eq!(empty.rows, 0);
    assert!(store.contains("EMPTY").unwrap());

    let examples = generate_examples(&store, None, &config).unwrap();
    let empty = examples.reports.iter().find(|r| r.symbol == "EMPTY").unwrap();
    assert!(empty.is_ok());
    assert_eq!(empty.rows, 0);
    assert_eq!(examples.meta.symbols, vec!["AAA", "BBB", "CCC"]);
    assert!(!examples.examples.is_empty());
}

#[test]
fn test_sqlite_store_end_to_end() {
    let store = SqliteFeatureStore::open_in_memory().unwrap();
    let config = config();
    build_features(&source(), &store, &config, false).unwrap();

    let memory = MemoryFeatureStore::new();
    build_features(&source(), &memory, &config, false).unwrap();

    let from_sqlite = generate_examples(&store, None, &config).unwrap();
    let from_memory = generate_examples(&memory, None, &config).unwrap();
    assert_eq!(from_sqlite.examples, from_memory.examples);
}
