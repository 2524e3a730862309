//! Raw bar sources.
//!
//! A source hands out one time-ordered raw series per symbol. Loaded
//! series are validated (positive prices, non-negative volume, ascending
//! timestamps) so that downstream log ratios are always defined.

use forecast_core::{validate_raw_series, Error, RawBar, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider of raw per-symbol bar series.
pub trait BarSource: Send + Sync {
    /// All symbols this source can load, sorted.
    fn symbols(&self) -> Result<Vec<String>>;

    /// Load and validate one symbol's raw series.
    fn load(&self, symbol: &str) -> Result<Vec<RawBar>>;
}

/// Reads `<dir>/<SYMBOL>.csv` files with a
/// `time,close,high,low,open,volume` header.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    /// Parse raw bars from any CSV reader.
    pub fn read_bars<R: std::io::Read>(reader: R) -> Result<Vec<RawBar>> {
        let mut csv = csv::Reader::from_reader(reader);
        let mut bars = Vec::new();
        for (line, record) in csv.deserialize::<RawBar>().enumerate() {
            let bar = record.map_err(|e| Error::data(format!("CSV row {}: {}", line + 1, e)))?;
            bars.push(bar);
        }
        Ok(bars)
    }

    fn read_file(path: &Path) -> Result<Vec<RawBar>> {
        let file = std::fs::File::open(path)?;
        Self::read_bars(std::io::BufReader::new(file))
    }
}

impl BarSource for CsvBarSource {
    fn symbols(&self) -> Result<Vec<String>> {
        let mut symbols = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    fn load(&self, symbol: &str) -> Result<Vec<RawBar>> {
        let path = self.path_for(symbol);
        let bars = Self::read_file(&path)
            .map_err(|e| Error::data(format!("{}: {}", path.display(), e)))?;
        validate_raw_series(&bars)?;
        debug!(symbol, bars = bars.len(), "loaded raw bars");
        Ok(bars)
    }
}

/// In-memory source, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryBarSource {
    series: BTreeMap<String, Vec<RawBar>>,
}

impl MemoryBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<RawBar>) {
        self.series.insert(symbol.into(), bars);
    }

    pub fn with(mut self, symbol: impl Into<String>, bars: Vec<RawBar>) -> Self {
        self.insert(symbol, bars);
        self
    }
}

impl BarSource for MemoryBarSource {
    fn symbols(&self) -> Result<Vec<String>> {
        Ok(self.series.keys().cloned().collect())
    }

    fn load(&self, symbol: &str) -> Result<Vec<RawBar>> {
        let bars = self
            .series
            .get(symbol)
            .ok_or_else(|| Error::data(format!("unknown symbol {}", symbol)))?;
        validate_raw_series(bars)?;
        Ok(bars.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "time,close,high,low,open,volume\n\
                       1396445460,10.5,10.75,10.0,10.25,300\n\
                       1396445520,10.6,10.8,10.4,10.5,120\n";

    #[test]
    fn test_read_bars() {
        let bars = CsvBarSource::read_bars(CSV.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 1_396_445_460.0);
        assert_eq!(bars[0].open, 10.25);
        assert_eq!(bars[1].volume, 120.0);
    }

    #[test]
    fn test_malformed_row_is_a_data_error() {
        let text = "time,close,high,low,open,volume\n1,abc,1,1,1,1\n";
        let err = CsvBarSource::read_bars(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("MSFT.csv")).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            dir.path().join("BAD.csv"),
            "time,close,high,low,open,volume\n1,0,0,0,0,1\n",
        )
        .unwrap();

        let source = CsvBarSource::new(dir.path());
        assert_eq!(source.symbols().unwrap(), vec!["BAD", "MSFT"]);
        assert_eq!(source.load("MSFT").unwrap().len(), 2);
        assert!(source.load("BAD").is_err());
        assert!(source.load("NOPE").is_err());
    }

    #[test]
    fn test_memory_source_validates() {
        let good = CsvBarSource::read_bars(CSV.as_bytes()).unwrap();
        let mut reversed = good.clone();
        reversed.reverse();

        let source = MemoryBarSource::new()
            .with("GOOD", good)
            .with("REVERSED", reversed);
        assert_eq!(source.symbols().unwrap(), vec!["GOOD", "REVERSED"]);
        assert!(source.load("GOOD").is_ok());
        assert!(source.load("REVERSED").is_err());
    }
}
