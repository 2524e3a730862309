//! Cross-symbol example merging.
//!
//! Per-symbol sets are concatenated and then reordered by timestamp with a
//! stable sort, so examples sharing a timestamp keep the order in which
//! their symbols were added.

use forecast_core::{Error, ExampleSet, Result};
use ordered_float::OrderedFloat;
use tracing::info;

/// Accumulates example sets and emits one time-ordered set.
#[derive(Debug, Clone)]
pub struct ExampleMerger {
    width: usize,
    sets: Vec<ExampleSet>,
    rows: usize,
}

impl ExampleMerger {
    /// Merger for rows of `width` features.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            sets: Vec::new(),
            rows: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Examples accumulated so far.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Add one symbol's examples. Empty sets are ignored.
    pub fn add(&mut self, set: ExampleSet) -> Result<()> {
        if set.is_empty() {
            return Ok(());
        }
        if set.width() != self.width {
            return Err(Error::data(format!(
                "cannot merge examples of width {} into width {}",
                set.width(),
                self.width
            )));
        }
        self.rows += set.len();
        self.sets.push(set);
        Ok(())
    }

    /// Concatenate everything added and sort by timestamp.
    pub fn finish(self) -> Result<ExampleSet> {
        let width = self.width;
        let mut timestamps = Vec::with_capacity(self.rows);
        let mut outcomes = Vec::with_capacity(self.rows);
        let mut features = Vec::with_capacity(self.rows * width);
        for set in &self.sets {
            timestamps.extend_from_slice(set.timestamps());
            outcomes.extend_from_slice(set.outcomes());
            features.extend_from_slice(set.features());
        }

        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by_key(|&i| OrderedFloat(timestamps[i]));

        let mut sorted_features = Vec::with_capacity(features.len());
        for &i in &order {
            sorted_features.extend_from_slice(&features[i * width..(i + 1) * width]);
        }
        let merged = ExampleSet::from_parts(
            width,
            sorted_features,
            order.iter().map(|&i| outcomes[i]).collect(),
            order.iter().map(|&i| timestamps[i]).collect(),
        )?;

        info!(
            symbols = self.sets.len(),
            examples = merged.len(),
            width,
            "merged examples"
        );
        Ok(merged)
    }
}

/// Merge `sets` into one time-ordered set of `width`-wide rows.
pub fn merge<I>(width: usize, sets: I) -> Result<ExampleSet>
where
    I: IntoIterator<Item = ExampleSet>,
{
    let mut merger = ExampleMerger::new(width);
    for set in sets {
        merger.add(set)?;
    }
    merger.finish()
}
