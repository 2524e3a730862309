//! Feature store interface and the in-memory backend.

use forecast_core::{Error, FeatureParameters, FeatureSeries, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Per-symbol metadata recorded next to a feature series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    pub symbol: String,
    pub period: u32,
    pub intervals_per_day: usize,
    pub num_days: usize,
    pub width: usize,
    pub rows: usize,
}

impl SeriesInfo {
    pub fn of(symbol: &str, series: &FeatureSeries) -> Self {
        Self {
            symbol: symbol.to_string(),
            period: series.period,
            intervals_per_day: series.intervals_per_day,
            num_days: series.num_days,
            width: series.width(),
            rows: series.len(),
        }
    }
}

/// Keyed storage for per-symbol feature series plus the one parameter
/// record that describes their columns.
pub trait FeatureStore: Send + Sync {
    /// Replace the global feature parameter record.
    fn put_params(&self, params: &FeatureParameters) -> Result<()>;

    /// The global feature parameter record, if one was written.
    fn params(&self) -> Result<Option<FeatureParameters>>;

    /// Insert or replace a symbol's series.
    fn put_series(&self, symbol: &str, series: &FeatureSeries) -> Result<()>;

    /// Drop a symbol's series. Returns whether it was present.
    fn remove(&self, symbol: &str) -> Result<bool>;

    /// Load a symbol's series.
    fn series(&self, symbol: &str) -> Result<FeatureSeries>;

    /// Metadata for every stored symbol, ordered by symbol.
    fn info(&self) -> Result<Vec<SeriesInfo>>;

    /// Stored symbols in ascending order.
    fn symbols(&self) -> Result<Vec<String>> {
        Ok(self.info()?.into_iter().map(|i| i.symbol).collect())
    }

    fn contains(&self, symbol: &str) -> Result<bool> {
        Ok(self.symbols()?.iter().any(|s| s == symbol))
    }
}

/// `BTreeMap`-backed store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    params: RwLock<Option<FeatureParameters>>,
    series: RwLock<BTreeMap<String, FeatureSeries>>,
}

impl MemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::store("feature store lock poisoned")
}

impl FeatureStore for MemoryFeatureStore {
    fn put_params(&self, params: &FeatureParameters) -> Result<()> {
        params.validate()?;
        *self.params.write().map_err(|_| poisoned())? = Some(params.clone());
        Ok(())
    }

    fn params(&self) -> Result<Option<FeatureParameters>> {
        Ok(self.params.read().map_err(|_| poisoned())?.clone())
    }

    fn put_series(&self, symbol: &str, series: &FeatureSeries) -> Result<()> {
        self.series
            .write()
            .map_err(|_| poisoned())?
            .insert(symbol.to_string(), series.clone());
        Ok(())
    }

    fn remove(&self, symbol: &str) -> Result<bool> {
        Ok(self
            .series
            .write()
            .map_err(|_| poisoned())?
            .remove(symbol)
            .is_some())
    }

    fn series(&self, symbol: &str) -> Result<FeatureSeries> {
        self.series
            .read()
            .map_err(|_| poisoned())?
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::store(format!("no feature series for {}", symbol)))
    }

    fn info(&self) -> Result<Vec<SeriesInfo>> {
        Ok(self
            .series
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .map(|(symbol, series)| SeriesInfo::of(symbol, series))
            .collect())
    }

    fn contains(&self, symbol: &str) -> Result<bool> {
        Ok(self.series.read().map_err(|_| poisoned())?.contains_key(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::FeatureMatrix;

    fn series(rows: usize, width: usize) -> FeatureSeries {
        FeatureSeries {
            period: 30,
            intervals_per_day: 13,
            num_days: rows / 13,
            matrix: FeatureMatrix::zeros(rows, width),
        }
    }

    #[test]
    fn test_params_start_empty() {
        let store = MemoryFeatureStore::new();
        assert!(store.params().unwrap().is_none());
        let params = FeatureParameters::basic(13).unwrap();
        store.put_params(&params).unwrap();
        assert_eq!(store.params().unwrap(), Some(params));
    }

    #[test]
    fn test_symbols_are_sorted() {
        let store = MemoryFeatureStore::new();
        store.put_series("MSFT", &series(26, 4)).unwrap();
        store.put_series("AAPL", &series(13, 4)).unwrap();
        assert_eq!(store.symbols().unwrap(), vec!["AAPL", "MSFT"]);
        assert!(store.contains("AAPL").unwrap());
        assert!(!store.contains("GOOG").unwrap());

        let info = store.info().unwrap();
        assert_eq!(info[1].rows, 26);
        assert_eq!(info[1].num_days, 2);
    }

    #[test]
    fn test_remove() {
        let store = MemoryFeatureStore::new();
        store.put_series("AAPL", &series(13, 4)).unwrap();
        assert!(store.remove("AAPL").unwrap());
        assert!(!store.remove("AAPL").unwrap());
        assert!(store.symbols().unwrap().is_empty());
    }

    #[test]
    fn test_missing_series_is_a_store_error() {
        let store = MemoryFeatureStore::new();
        assert!(matches!(store.series("X"), Err(Error::Store(_))));
    }
}
