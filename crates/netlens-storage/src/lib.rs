//! Persistence layer for metric series and rule snapshots.
//!
//! The default metric backend ([`engine::SqliteMetricStore`]) is a single
//! SQLite database in WAL mode with a dedicated write connection, so
//! concurrent producers serialize on append while readers stay off the
//! write path. Rule snapshots live in a separate
//! [`snapshot_store::SnapshotStore`] database.

pub mod engine;
pub mod error;
pub mod snapshot_store;


use chrono::{DateTime, Duration, Utc};
use error::Result;
use netlens_common::types::{MetricPoint, SeriesId};

/// Age and size bounds applied to each series independently by a
/// retention sweep. `None` leaves that dimension unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy {
    /// Points older than this are purged.
    pub max_age: Option<Duration>,
    /// At most this many of the newest points are kept per series.
    pub max_points: Option<usize>,
}

/// Append-only time-series persistence.
///
/// Implementations must be safe to share across threads (`Send + Sync`):
/// collection fans out over many nodes, and independent series are
/// appended concurrently from that fan-out. Appends to the same series
/// serialize internally; callers need no coordination.
pub trait MetricStore: Send + Sync {
    /// Appends one point. Duplicate timestamps are retained as distinct
    /// points. Callers needing idempotence must dedupe upstream.
    fn append(&self, series: &SeriesId, point: MetricPoint) -> Result<()>;

    /// Appends a batch of points to one series in a single transaction.
    fn append_batch(&self, series: &SeriesId, points: &[MetricPoint]) -> Result<()>;

    /// Returns points in `[from, to]` sorted ascending by timestamp,
    /// regardless of insertion order. Fails with
    /// [`error::StorageError::UnknownSeries`] when the series was never
    /// appended; a known series with no points in range yields an empty
    /// vec.
    fn query(
        &self,
        series: &SeriesId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricPoint>>;

    /// Applies the retention policy to every series. Returns the number
    /// of points purged.
    fn retain(&self, policy: &RetentionPolicy) -> Result<u64>;
}
