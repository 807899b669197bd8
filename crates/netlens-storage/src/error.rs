/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use netlens_storage::error::StorageError;
///
/// let err = StorageError::UnknownSeries {
///     series: "net.latency_p99{node=worker-0}".to_string(),
/// };
/// assert!(err.to_string().contains("never been written"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query targeted a series with zero points ever appended.
    #[error("storage: series '{series}' has never been written")]
    UnknownSeries { series: String },

    /// An analysis asked for a node's rule state before any snapshot of
    /// that kind was pushed for it.
    #[error("storage: no {rule_kind} snapshot recorded for node '{node_id}'")]
    SnapshotMissing { node_id: String, rule_kind: String },

    /// An underlying SQLite error.
    #[error("storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failure (label and rule columns).
    #[error("storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure while opening or creating the data directory.
    #[error("storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted row could not be decoded back into its value type.
    #[error("storage: {0}")]
    Decode(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
