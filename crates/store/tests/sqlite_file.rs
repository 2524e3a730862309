//! SQLite stores persist across reopening the same file.

use forecast_core::{FeatureMatrix, FeatureParameters, FeatureSeries};
use forecast_store::{FeatureStore, SqliteFeatureStore};

#[test]
fn test_feature_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("features.db");
    let params = FeatureParameters::basic(13).unwrap();
    let series = FeatureSeries {
        period: 30,
        intervals_per_day: 13,
        num_days: 1,
        matrix: FeatureMatrix::zeros(13, params.width()),
    };

    {
        let store = SqliteFeatureStore::open(&path).unwrap();
        store.put_params(&params).unwrap();
        store.put_series("SPY", &series).unwrap();
    }

    let store = SqliteFeatureStore::open(&path).unwrap();
    assert_eq!(store.params().unwrap(), Some(params));
    assert_eq!(store.symbols().unwrap(), vec!["SPY".to_string()]);
    assert_eq!(store.series("SPY").unwrap(), series);
}
