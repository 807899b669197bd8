use crate::error::{Result, StorageError};
use crate::{MetricStore, RetentionPolicy};
use chrono::{DateTime, Utc};
use netlens_common::types::{MetricPoint, SeriesId};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SERIES_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS series (
    id TEXT PRIMARY KEY,
    series_key TEXT NOT NULL UNIQUE,
    metric_name TEXT NOT NULL,
    labels TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_series_metric ON series(metric_name);
";

const POINTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS points (
    id TEXT PRIMARY KEY,
    series_key TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    value REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_points_series_time ON points(series_key, timestamp);
";

/// SQLite-backed [`MetricStore`].
///
/// One database file in WAL mode with two connections: all writes go
/// through `writer` (serializing concurrent producers), reads go through
/// `reader` so a range scan never sits in front of an append.
pub struct SqliteMetricStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SqliteMetricStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("metrics.db");

        let writer = Connection::open(&path)?;
        writer.execute_batch("PRAGMA journal_mode=WAL;")?;
        writer.execute_batch(SERIES_SCHEMA)?;
        writer.execute_batch(POINTS_SCHEMA)?;

        let reader = Connection::open(&path)?;
        reader.execute_batch("PRAGMA journal_mode=WAL;")?;

        tracing::info!(path = %path.display(), "Opened metric store");
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    /// Lock a connection, recovering from a poisoned Mutex if necessary.
    fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
        conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn series_known(conn: &Connection, key: &str) -> Result<bool> {
        let known: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM series WHERE series_key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        )?;
        Ok(known)
    }
}

impl MetricStore for SqliteMetricStore {
    fn append(&self, series: &SeriesId, point: MetricPoint) -> Result<()> {
        self.append_batch(series, std::slice::from_ref(&point))
    }

    fn append_batch(&self, series: &SeriesId, points: &[MetricPoint]) -> Result<()> {
        let key = series.to_string();
        let labels_json = serde_json::to_string(&series.labels)?;
        let conn = Self::lock(&self.writer);
        let tx = conn.unchecked_transaction()?;
        {
            tx.prepare_cached(
                "INSERT OR IGNORE INTO series (id, series_key, metric_name, labels, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(rusqlite::params![
                netlens_common::id::next_id(),
                &key,
                &series.metric_name,
                labels_json,
                Utc::now().timestamp_millis(),
            ])?;

            let mut stmt = tx.prepare_cached(
                "INSERT INTO points (id, series_key, timestamp, value) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for point in points {
                stmt.execute(rusqlite::params![
                    netlens_common::id::next_id(),
                    &key,
                    point.timestamp.timestamp_millis(),
                    point.value,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn query(
        &self,
        series: &SeriesId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricPoint>> {
        let key = series.to_string();
        let conn = Self::lock(&self.reader);

        if !Self::series_known(&conn, &key)? {
            return Err(StorageError::UnknownSeries { series: key });
        }

        let mut stmt = conn.prepare_cached(
            "SELECT timestamp, value FROM points
             WHERE series_key = ?1 AND timestamp >= ?2 AND timestamp <= ?3
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![&key, from.timestamp_millis(), to.timestamp_millis()],
            |row| {
                let ts_ms: i64 = row.get(0)?;
                let value: f64 = row.get(1)?;
                Ok((ts_ms, value))
            },
        )?;

        let mut points = Vec::new();
        for row in rows {
            let (ts_ms, value) = row?;
            let timestamp = DateTime::from_timestamp_millis(ts_ms).unwrap_or_default();
            points.push(MetricPoint { timestamp, value });
        }
        Ok(points)
    }

    fn retain(&self, policy: &RetentionPolicy) -> Result<u64> {
        let conn = Self::lock(&self.writer);
        let keys: Vec<String> = {
            let mut stmt = conn.prepare_cached("SELECT series_key FROM series")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };

        let mut purged = 0u64;
        for key in keys {
            if let Some(max_age) = policy.max_age {
                let cutoff = (Utc::now() - max_age).timestamp_millis();
                purged += conn.execute(
                    "DELETE FROM points WHERE series_key = ?1 AND timestamp < ?2",
                    rusqlite::params![&key, cutoff],
                )? as u64;
            }
            if let Some(max_points) = policy.max_points {
                purged += conn.execute(
                    "DELETE FROM points WHERE series_key = ?1 AND id NOT IN (
                         SELECT id FROM points WHERE series_key = ?1
                         ORDER BY timestamp DESC, id DESC LIMIT ?2
                     )",
                    rusqlite::params![&key, max_points as i64],
                )? as u64;
            }
        }

        if purged > 0 {
            tracing::info!(purged, "Retention sweep purged metric points");
        }
        Ok(purged)
    }
}
