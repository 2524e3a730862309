//! Forecast dataset CLI.
//!
//! Commands:
//! - `features`: aggregate CSV minute bars and store feature series
//! - `examples`: sample, label and merge examples into a dataset file
//! - `inspect`: show what a feature store or dataset contains

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forecast_core::{day_offset_to_datetime, Config};
use forecast_ingestion::CsvBarSource;
use forecast_pipeline::{build_features, generate_examples, SymbolReport};
use forecast_store::{DatasetStore, FeatureStore, SqliteDatasetStore, SqliteFeatureStore};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forecast", about = "OHLCV bar forecasting dataset builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate raw minute bars and store per-symbol feature series.
    Features {
        /// Directory of `<SYMBOL>.csv` files.
        #[arg(long)]
        input: PathBuf,

        /// Feature store database.
        #[arg(long)]
        store: PathBuf,

        /// TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Recompute symbols already in the store.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Build the merged, time-ordered example dataset.
    Examples {
        /// Feature store database.
        #[arg(long)]
        store: PathBuf,

        /// Output dataset database.
        #[arg(long)]
        output: PathBuf,

        /// TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Restrict to these symbols.
        #[arg(long, num_args = 1..)]
        symbols: Option<Vec<String>>,
    },
    /// Print stored parameters and per-symbol metadata.
    Inspect {
        /// Feature store database.
        #[arg(long)]
        store: PathBuf,

        /// Also summarize a dataset database.
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Features {
            input,
            store,
            config,
            force,
        } => run_features(&input, &store, config.as_deref(), force),
        Commands::Examples {
            store,
            output,
            config,
            symbols,
        } => run_examples(&store, &output, config.as_deref(), symbols),
        Commands::Inspect { store, dataset } => run_inspect(&store, dataset.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn print_reports(reports: &[SymbolReport]) {
    for report in reports {
        println!("  {}", report);
    }
}

fn run_features(input: &Path, store: &Path, config: Option<&Path>, force: bool) -> Result<()> {
    let config = load_config(config)?;
    if !input.is_dir() {
        bail!("input {} is not a directory", input.display());
    }
    let source = CsvBarSource::new(input);
    let store = SqliteFeatureStore::open(store)
        .with_context(|| format!("failed to open feature store {}", store.display()))?;

    let run = build_features(&source, &store, &config, force)?;

    println!(
        "Features: {} built, {} failed, {} skipped, {} removed (width {})",
        run.reports.iter().filter(|r| r.is_ok()).count(),
        run.failures().count(),
        run.skipped.len(),
        run.removed.len(),
        run.params.width()
    );
    print_reports(&run.reports);
    Ok(())
}

fn run_examples(
    store: &Path,
    output: &Path,
    config: Option<&Path>,
    symbols: Option<Vec<String>>,
) -> Result<()> {
    let config = load_config(config)?;
    let features = SqliteFeatureStore::open(store)
        .with_context(|| format!("failed to open feature store {}", store.display()))?;

    let run = generate_examples(&features, symbols.as_deref(), &config)?;

    let dataset = SqliteDatasetStore::open(output)
        .with_context(|| format!("failed to open dataset {}", output.display()))?;
    dataset.write(&run.examples, &run.meta)?;
    info!(path = %output.display(), rows = run.examples.len(), "dataset written");

    println!(
        "Examples: {} rows of width {} from {} symbols",
        run.examples.len(),
        run.examples.width(),
        run.meta.symbols.len()
    );
    print_reports(&run.reports);
    Ok(())
}

fn format_day(day_offset: f64) -> String {
    day_offset_to_datetime(day_offset)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn run_inspect(store: &Path, dataset: Option<&Path>) -> Result<()> {
    let features = SqliteFeatureStore::open(store)
        .with_context(|| format!("failed to open feature store {}", store.display()))?;

    match features.params()? {
        Some(params) => {
            println!("Feature parameters ({} columns):", params.width());
            println!("  intervals per day: {}", params.intervals_per_day());
            println!("  LPR strides:       {:?}", params.strides_lpr());
            println!("  SMA windows:       {:?}", params.strides_sma());
            println!("  volume spans:      {:?}", params.volume_intervals());
        }
        None => println!("No feature parameters stored."),
    }

    let info = features.info()?;
    println!("{} symbols:", info.len());
    for series in &info {
        let span = if series.rows == 0 {
            String::new()
        } else {
            let stored = features.series(&series.symbol)?;
            let first = stored.matrix.get(0, 0);
            let last = stored.matrix.get(stored.len() - 1, 0);
            format!(" {} .. {}", format_day(first), format_day(last))
        };
        println!(
            "  {:<8} {:>4} days {:>7} bars  {}m x{}{}",
            series.symbol, series.num_days, series.rows, series.period, series.width, span
        );
    }

    if let Some(path) = dataset {
        let store = SqliteDatasetStore::open(path)
            .with_context(|| format!("failed to open dataset {}", path.display()))?;
        let (examples, meta) = store.read()?;
        let mean = if examples.is_empty() {
            0.0
        } else {
            examples.outcomes().iter().sum::<f64>() / examples.len() as f64
        };
        println!("Dataset {}:", path.display());
        println!("  rows: {}  width: {}", examples.len(), examples.width());
        println!(
            "  gain: {}  loss: {}  horizon: {}  entry: {:?}",
            meta.gain, meta.loss, meta.horizon, meta.entry
        );
        println!("  mean outcome: {:.4}", mean);
        println!("  symbols: {}", meta.symbols.join(", "));
    }
    Ok(())
}
