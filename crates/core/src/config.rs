//! Configuration structures for the forecasting pipeline.

use crate::error::{Error, Result};
use crate::params::FeatureParameters;
use crate::types::{intervals_per_day, EntryPrice};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bar aggregation configuration.
    pub aggregation: AggregationConfig,
    /// Feature parameter configuration.
    pub features: FeatureConfig,
    /// Outcome labeling configuration.
    pub labeling: LabelingConfig,
    /// Decision sampling configuration.
    pub sampling: SamplingConfig,
    /// Worker pool configuration.
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Parse a TOML document. Missing sections take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.aggregation.period_minutes == 0 {
            return Err(Error::config("aggregation.period_minutes must be at least 1"));
        }
        if !(self.labeling.gain_pct > 0.0) {
            return Err(Error::config("labeling.gain_pct must be positive"));
        }
        if !(self.labeling.loss_pct > 0.0 && self.labeling.loss_pct < 100.0) {
            return Err(Error::config("labeling.loss_pct must be in (0, 100)"));
        }
        if self.labeling.horizon_bars == Some(0) {
            return Err(Error::config("labeling.horizon_bars must be at least 1"));
        }
        if self.sampling.window.samples == 0 {
            return Err(Error::config("sampling.window.samples must be at least 1"));
        }
        self.feature_parameters()?;
        Ok(())
    }

    /// Bars per trading day for the configured period.
    pub fn intervals_per_day(&self) -> usize {
        intervals_per_day(self.aggregation.period_minutes)
    }

    /// Feature parameters for the configured period.
    pub fn feature_parameters(&self) -> Result<FeatureParameters> {
        self.features.build(self.intervals_per_day())
    }

    /// Take-profit factor, e.g. 1.005 for 0.5%.
    pub fn gain(&self) -> f64 {
        1.0 + self.labeling.gain_pct / 100.0
    }

    /// Stop-loss factor, e.g. 0.995 for 0.5%.
    pub fn loss(&self) -> f64 {
        1.0 - self.labeling.loss_pct / 100.0
    }

    /// Holding horizon in bars; one trading day unless configured.
    pub fn horizon(&self) -> usize {
        self.labeling
            .horizon_bars
            .unwrap_or_else(|| self.intervals_per_day())
    }
}

/// Bar aggregation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Minutes per aggregated bar.
    pub period_minutes: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { period_minutes: 2 }
    }
}

/// Named stride presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeaturePreset {
    Basic,
    #[default]
    Extended,
}

/// Feature parameter configuration.
///
/// Explicit lists override the preset one family at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Preset the stride lists start from.
    pub preset: FeaturePreset,
    /// Override for log-price-relative strides.
    pub strides_lpr: Option<Vec<usize>>,
    /// Override for moving-average windows.
    pub strides_sma: Option<Vec<usize>>,
    /// Override for short volume EMA spans.
    pub volume_intervals: Option<Vec<usize>>,
}

impl FeatureConfig {
    /// Resolve the preset and overrides for a given bars-per-day value.
    pub fn build(&self, intervals_per_day: usize) -> Result<FeatureParameters> {
        let base = match self.preset {
            FeaturePreset::Basic => FeatureParameters::basic(intervals_per_day)?,
            FeaturePreset::Extended => FeatureParameters::extended(intervals_per_day)?,
        };
        FeatureParameters::new(
            intervals_per_day,
            self.strides_lpr
                .clone()
                .unwrap_or_else(|| base.strides_lpr().to_vec()),
            self.strides_sma
                .clone()
                .unwrap_or_else(|| base.strides_sma().to_vec()),
            self.volume_intervals
                .clone()
                .unwrap_or_else(|| base.volume_intervals().to_vec()),
        )
    }
}

/// Outcome labeling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Take-profit distance in percent.
    pub gain_pct: f64,
    /// Stop-loss distance in percent.
    pub loss_pct: f64,
    /// Holding horizon in bars (default: one trading day).
    pub horizon_bars: Option<usize>,
    /// Entry price used as the reference.
    pub entry: EntryPrice,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            gain_pct: 0.5,
            loss_pct: 0.5,
            horizon_bars: None,
            entry: EntryPrice::Open,
        }
    }
}

/// Which feature columns an example window samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    /// Number of historical rows sampled per column.
    pub samples: usize,
    /// Index into `strides_lpr` of the sampling stride.
    pub lpr_stride: usize,
    /// Indices into `strides_sma` of the sampled SMA-ratio columns.
    pub sma_columns: Vec<usize>,
    /// Indices into `volume_intervals` of the sampled volume columns.
    pub volume_columns: Vec<usize>,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            samples: 200,
            lpr_stride: 0,
            sma_columns: vec![0, 1, 6],
            volume_columns: vec![0],
        }
    }
}

impl WindowSpec {
    /// Check that every referenced column exists in `params`.
    pub fn validate(&self, params: &FeatureParameters) -> Result<()> {
        if self.samples == 0 {
            return Err(Error::config("window must sample at least one row"));
        }
        if self.lpr_stride >= params.strides_lpr().len() {
            return Err(Error::config(format!(
                "window LPR stride index {} out of range ({} strides)",
                self.lpr_stride,
                params.strides_lpr().len()
            )));
        }
        if let Some(&bad) = self
            .sma_columns
            .iter()
            .find(|&&c| c >= params.strides_sma().len())
        {
            return Err(Error::config(format!(
                "window SMA column {} out of range ({} windows)",
                bad,
                params.strides_sma().len()
            )));
        }
        if let Some(&bad) = self
            .volume_columns
            .iter()
            .find(|&&c| c >= params.volume_intervals().len())
        {
            return Err(Error::config(format!(
                "window volume column {} out of range ({} intervals)",
                bad,
                params.volume_intervals().len()
            )));
        }
        Ok(())
    }

    /// Example width: time of day plus one block per sampled column.
    pub fn width(&self) -> usize {
        1 + self.samples * (4 + self.sma_columns.len() + self.volume_columns.len())
    }
}

/// Decision sampling configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Master seed; per-symbol generators are derived from it.
    pub seed: u64,
    /// Lookback window layout.
    pub window: WindowSpec,
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of worker threads (0 = auto).
    pub workers: usize,
    /// Leave symbols already present in the feature store untouched.
    pub skip_existing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            skip_existing: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.aggregation.period_minutes, 2);
        assert_eq!(config.intervals_per_day(), 195);
        assert_eq!(config.horizon(), 195);
        assert_relative_eq!(config.gain(), 1.005);
        assert_relative_eq!(config.loss(), 0.995);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [aggregation]
            period_minutes = 5

            [labeling]
            gain_pct = 2.0
            loss_pct = 1.0
            horizon_bars = 5
            entry = "high"

            [features]
            preset = "basic"
            strides_sma = [4, 8]
            "#,
        )
        .unwrap();

        assert_eq!(config.intervals_per_day(), 78);
        assert_eq!(config.horizon(), 5);
        assert_eq!(config.labeling.entry, EntryPrice::High);
        assert_relative_eq!(config.gain(), 1.02);
        assert_relative_eq!(config.loss(), 0.99);

        let params = config.feature_parameters().unwrap();
        assert_eq!(params.strides_sma(), &[4, 8]);
        assert_eq!(params.strides_lpr(), &[1, 2, 5, 10, 20, 78]);
        assert_eq!(config.sampling, SamplingConfig::default());
    }

    #[test]
    fn test_rejects_invalid_toml_values() {
        assert!(Config::from_toml_str("[aggregation]\nperiod_minutes = 0").is_err());
        assert!(Config::from_toml_str("[labeling]\nloss_pct = 100.0").is_err());
        assert!(Config::from_toml_str("[labeling]\nhorizon_bars = 0").is_err());
        assert!(Config::from_toml_str("[features]\nstrides_lpr = []").is_err());
    }

    #[test]
    fn test_window_width_and_validation() {
        let window = WindowSpec::default();
        assert_eq!(window.width(), 1 + 200 * 8);

        let extended = FeatureParameters::extended(195).unwrap();
        assert!(window.validate(&extended).is_ok());

        // basic preset only has three SMA windows
        let basic = FeatureParameters::basic(195).unwrap();
        assert!(window.validate(&basic).is_err());
    }
}
