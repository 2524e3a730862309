//! SQLite backends.
//!
//! Feature matrices and example rows are stored as little-endian `f64`
//! blobs; parameter and dataset metadata records are JSON text.

use crate::blob;
use crate::dataset::{DatasetMeta, DatasetStore};
use crate::feature::{FeatureStore, SeriesInfo};
use forecast_core::{Error, ExampleSet, FeatureMatrix, FeatureParameters, FeatureSeries, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

fn sql_err(e: rusqlite::Error) -> Error {
    Error::store(format!("sqlite: {}", e))
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| Error::store("sqlite connection lock poisoned"))
}

fn to_usize(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::store(format!("stored {} {} is negative", what, value)))
}

/// Feature store in a SQLite file.
pub struct SqliteFeatureStore {
    conn: Mutex<Connection>,
}

impl SqliteFeatureStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(sql_err)?;
        Self::init(conn)
    }

    /// A private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(sql_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS feature_params (
                 id   INTEGER PRIMARY KEY CHECK (id = 1),
                 json TEXT    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS series (
                 symbol            TEXT    PRIMARY KEY,
                 period            INTEGER NOT NULL,
                 intervals_per_day INTEGER NOT NULL,
                 num_days          INTEGER NOT NULL,
                 width             INTEGER NOT NULL,
                 data              BLOB    NOT NULL
             );",
        )
        .map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl FeatureStore for SqliteFeatureStore {
    fn put_params(&self, params: &FeatureParameters) -> Result<()> {
        params.validate()?;
        let json = serde_json::to_string(params)?;
        lock(&self.conn)?
            .execute(
                "INSERT OR REPLACE INTO feature_params (id, json) VALUES (1, ?1)",
                params![json],
            )
            .map_err(sql_err)?;
        Ok(())
    }

    fn params(&self) -> Result<Option<FeatureParameters>> {
        let json: Option<String> = lock(&self.conn)?
            .query_row("SELECT json FROM feature_params WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(sql_err)?;

        match json {
            Some(json) => {
                let params: FeatureParameters = serde_json::from_str(&json)?;
                params.validate()?;
                Ok(Some(params))
            }
            None => Ok(None),
        }
    }

    fn put_series(&self, symbol: &str, series: &FeatureSeries) -> Result<()> {
        let data = blob::encode(series.matrix.values());
        lock(&self.conn)?
            .execute(
                "INSERT OR REPLACE INTO series
                     (symbol, period, intervals_per_day, num_days, width, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    symbol,
                    series.period as i64,
                    series.intervals_per_day as i64,
                    series.num_days as i64,
                    series.width() as i64,
                    data
                ],
            )
            .map_err(sql_err)?;
        debug!(symbol, rows = series.len(), width = series.width(), "stored feature series");
        Ok(())
    }

    fn remove(&self, symbol: &str) -> Result<bool> {
        let removed = lock(&self.conn)?
            .execute("DELETE FROM series WHERE symbol = ?1", params![symbol])
            .map_err(sql_err)?;
        if removed > 0 {
            debug!(symbol, "removed feature series");
        }
        Ok(removed > 0)
    }

    fn series(&self, symbol: &str) -> Result<FeatureSeries> {
        let row = lock(&self.conn)?
            .query_row(
                "SELECT period, intervals_per_day, num_days, width, data
                 FROM series WHERE symbol = ?1",
                params![symbol],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(sql_err)?;

        let Some((period, ipd, num_days, width, data)) = row else {
            return Err(Error::store(format!("no feature series for {}", symbol)));
        };
        let period = u32::try_from(period)
            .map_err(|_| Error::store(format!("stored period {} out of range", period)))?;
        let matrix = FeatureMatrix::from_values(to_usize(width, "width")?, blob::decode(&data)?)?;

        Ok(FeatureSeries {
            period,
            intervals_per_day: to_usize(ipd, "intervals_per_day")?,
            num_days: to_usize(num_days, "num_days")?,
            matrix,
        })
    }

    fn info(&self) -> Result<Vec<SeriesInfo>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, period, intervals_per_day, num_days, width, length(data)
                 FROM series ORDER BY symbol",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(sql_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (symbol, period, ipd, num_days, width, bytes) = row.map_err(sql_err)?;
            let width = to_usize(width, "width")?;
            let values = to_usize(bytes, "blob length")? / std::mem::size_of::<f64>();
            out.push(SeriesInfo {
                symbol,
                period: u32::try_from(period)
                    .map_err(|_| Error::store(format!("stored period {} out of range", period)))?,
                intervals_per_day: to_usize(ipd, "intervals_per_day")?,
                num_days: to_usize(num_days, "num_days")?,
                width,
                rows: if width == 0 { 0 } else { values / width },
            });
        }
        Ok(out)
    }

    fn contains(&self, symbol: &str) -> Result<bool> {
        lock(&self.conn)?
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM series WHERE symbol = ?1)",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(sql_err)
    }
}

/// Example dataset in a SQLite file.
pub struct SqliteDatasetStore {
    conn: Mutex<Connection>,
}

impl SqliteDatasetStore {
    /// Open or create a dataset at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(sql_err)?;
        Self::init(conn)
    }

    /// A private in-memory dataset.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(sql_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS dataset_meta (
                 id   INTEGER PRIMARY KEY CHECK (id = 1),
                 json TEXT    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS examples (
                 row       INTEGER PRIMARY KEY,
                 timestamp REAL    NOT NULL,
                 outcome   REAL    NOT NULL,
                 features  BLOB    NOT NULL
             );",
        )
        .map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl DatasetStore for SqliteDatasetStore {
    fn write(&self, set: &ExampleSet, meta: &DatasetMeta) -> Result<()> {
        meta.check(set)?;
        let json = serde_json::to_string(meta)?;

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction().map_err(sql_err)?;
        tx.execute("DELETE FROM examples", []).map_err(sql_err)?;
        tx.execute(
            "INSERT OR REPLACE INTO dataset_meta (id, json) VALUES (1, ?1)",
            params![json],
        )
        .map_err(sql_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO examples (row, timestamp, outcome, features)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(sql_err)?;
            for row in 0..set.len() {
                stmt.execute(params![
                    row as i64,
                    set.timestamps()[row],
                    set.outcomes()[row],
                    blob::encode(set.feature_row(row))
                ])
                .map_err(sql_err)?;
            }
        }
        tx.commit().map_err(sql_err)?;

        debug!(rows = set.len(), width = set.width(), "stored dataset");
        Ok(())
    }

    fn read(&self) -> Result<(ExampleSet, DatasetMeta)> {
        let conn = lock(&self.conn)?;
        let json: Option<String> = conn
            .query_row("SELECT json FROM dataset_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(sql_err)?;
        let json = json.ok_or_else(|| Error::store("no dataset has been written"))?;
        let meta: DatasetMeta = serde_json::from_str(&json)?;

        let mut stmt = conn
            .prepare("SELECT timestamp, outcome, features FROM examples ORDER BY row")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(sql_err)?;

        let mut set = ExampleSet::new(meta.width());
        for row in rows {
            let (timestamp, outcome, features) = row.map_err(sql_err)?;
            set.push(&blob::decode(&features)?, outcome, timestamp)?;
        }
        meta.check(&set)?;
        Ok((set, meta))
    }
}
