use netlens_analysis::error::AnalysisError;
use netlens_storage::error::StorageError;

/// Errors surfaced to the orchestrator's caller.
///
/// Every failed request maps to exactly one of these. There is no
/// partial report, so a caller can always distinguish "consistent" from
/// "could not be evaluated".
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Externally supplied configuration failed validation (e.g. an
    /// unparseable threshold comparator).
    #[error("configuration: {detail}")]
    Configuration { detail: String },
}

/// Convenience `Result` alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
