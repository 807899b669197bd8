use crate::error::{Result, StorageError};
use chrono::{DateTime, Duration, Utc};
use netlens_common::types::{RuleEntry, RuleKind, RuleSnapshot};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SNAPSHOTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rule_snapshots (
    id TEXT PRIMARY KEY,
    node_id TEXT NOT NULL,
    rule_kind TEXT NOT NULL,
    captured_at INTEGER NOT NULL,
    rules TEXT NOT NULL,
    UNIQUE(node_id, rule_kind)
);
CREATE INDEX IF NOT EXISTS idx_snapshots_captured ON rule_snapshots(captured_at);
";

/// Keeps the latest rule snapshot per `(node, kind)` pair.
///
/// Snapshots are immutable values; a newer capture for the same pair
/// replaces the older row. Old captures are dropped by [`prune`], which
/// the retention sweep drives with the same age bound as the metric
/// store.
///
/// [`prune`]: SnapshotStore::prune
pub struct SnapshotStore {
    conn: Mutex<Connection>,
}

impl SnapshotStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("snapshots.db");
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SNAPSHOTS_SCHEMA)?;
        tracing::info!(path = %path.display(), "Opened snapshot store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records `snapshot` as the latest state for its `(node, kind)` pair.
    pub fn put(&self, snapshot: &RuleSnapshot) -> Result<()> {
        let rules_json = serde_json::to_string(&snapshot.rules)?;
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO rule_snapshots (id, node_id, rule_kind, captured_at, rules)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                netlens_common::id::next_id(),
                &snapshot.node_id,
                snapshot.rule_kind.to_string(),
                snapshot.captured_at.timestamp_millis(),
                rules_json,
            ],
        )?;
        Ok(())
    }

    /// Returns the latest snapshot for `(node, kind)`, or `None` when the
    /// node has never pushed one.
    pub fn latest(&self, node_id: &str, rule_kind: RuleKind) -> Result<Option<RuleSnapshot>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT captured_at, rules FROM rule_snapshots
             WHERE node_id = ?1 AND rule_kind = ?2",
        )?;
        let mut rows = stmt.query(rusqlite::params![node_id, rule_kind.to_string()])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let captured_ms: i64 = row.get(0)?;
        let rules_json: String = row.get(1)?;
        let rules: BTreeSet<RuleEntry> = serde_json::from_str(&rules_json)?;
        Ok(Some(RuleSnapshot {
            node_id: node_id.to_string(),
            captured_at: DateTime::from_timestamp_millis(captured_ms).unwrap_or_default(),
            rule_kind,
            rules,
        }))
    }

    /// Like [`latest`], but treats an absent snapshot as an error naming
    /// the unmet precondition.
    ///
    /// [`latest`]: SnapshotStore::latest
    pub fn require_latest(&self, node_id: &str, rule_kind: RuleKind) -> Result<RuleSnapshot> {
        self.latest(node_id, rule_kind)?
            .ok_or_else(|| StorageError::SnapshotMissing {
                node_id: node_id.to_string(),
                rule_kind: rule_kind.to_string(),
            })
    }

    /// Drops snapshots captured longer than `max_age` ago. Returns the
    /// number of rows removed.
    pub fn prune(&self, max_age: Duration) -> Result<u64> {
        let cutoff = (Utc::now() - max_age).timestamp_millis();
        let conn = self.lock();
        let removed = conn.execute(
            "DELETE FROM rule_snapshots WHERE captured_at < ?1",
            rusqlite::params![cutoff],
        )? as u64;
        if removed > 0 {
            tracing::info!(removed, "Pruned expired rule snapshots");
        }
        Ok(removed)
    }
}
