//! Example dataset storage.

use forecast_core::{EntryPrice, Error, ExampleSet, FeatureParameters, Result, WindowSpec};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Everything a consumer needs to interpret a dataset's columns and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Take-profit factor.
    pub gain: f64,
    /// Stop-loss factor.
    pub loss: f64,
    /// Holding horizon in bars.
    pub horizon: usize,
    /// Entry reference price.
    pub entry: EntryPrice,
    /// Feature parameters the windows were cut from.
    pub params: FeatureParameters,
    /// Window layout of each example row.
    pub window: WindowSpec,
    /// Symbols that contributed examples.
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl DatasetMeta {
    /// Example row width implied by the window layout.
    pub fn width(&self) -> usize {
        self.window.width()
    }

    /// Check that the metadata describes `set`.
    pub fn check(&self, set: &ExampleSet) -> Result<()> {
        self.params.validate()?;
        self.window.validate(&self.params)?;
        if set.width() != self.width() {
            return Err(Error::store(format!(
                "dataset rows have width {} but metadata implies {}",
                set.width(),
                self.width()
            )));
        }
        Ok(())
    }
}

/// Storage for one merged dataset.
pub trait DatasetStore {
    /// Replace the stored dataset.
    fn write(&self, set: &ExampleSet, meta: &DatasetMeta) -> Result<()>;

    /// Load the stored dataset.
    fn read(&self) -> Result<(ExampleSet, DatasetMeta)>;
}

/// In-memory dataset store.
#[derive(Debug, Default)]
pub struct MemoryDatasetStore {
    inner: RwLock<Option<(ExampleSet, DatasetMeta)>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetStore for MemoryDatasetStore {
    fn write(&self, set: &ExampleSet, meta: &DatasetMeta) -> Result<()> {
        meta.check(set)?;
        *self
            .inner
            .write()
            .map_err(|_| Error::store("dataset store lock poisoned"))? =
            Some((set.clone(), meta.clone()));
        Ok(())
    }

    fn read(&self) -> Result<(ExampleSet, DatasetMeta)> {
        self.inner
            .read()
            .map_err(|_| Error::store("dataset store lock poisoned"))?
            .clone()
            .ok_or_else(|| Error::store("no dataset has been written"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> DatasetMeta {
        let params = FeatureParameters::new(13, vec![1], vec![2], vec![3]).unwrap();
        DatasetMeta {
            gain: 1.005,
            loss: 0.995,
            horizon: 13,
            entry: EntryPrice::Open,
            params,
            window: WindowSpec {
                samples: 2,
                lpr_stride: 0,
                sma_columns: vec![0],
                volume_columns: vec![0],
            },
            symbols: vec!["AAPL".into()],
        }
    }

    #[test]
    fn test_width_from_window() {
        assert_eq!(meta().width(), 1 + 2 * 6);
    }

    #[test]
    fn test_memory_store_checks_width() {
        let store = MemoryDatasetStore::new();
        assert!(store.read().is_err());
        assert!(store.write(&ExampleSet::new(5), &meta()).is_err());

        let mut set = ExampleSet::new(13);
        set.push(&[0.5; 13], 0.25, 1.0).unwrap();
        store.write(&set, &meta()).unwrap();
        let (loaded, loaded_meta) = store.read().unwrap();
        assert_eq!(loaded, set);
        assert_eq!(loaded_meta, meta());
    }

    #[test]
    fn test_meta_json_field_names() {
        let json = serde_json::to_value(meta()).unwrap();
        assert_eq!(json["entry"], "open");
        assert_eq!(json["window"]["samples"], 2);
    }
}
