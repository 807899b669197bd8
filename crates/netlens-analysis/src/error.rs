/// Errors surfaced by the analysis functions.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The inputs cannot be compared with each other: mixed rule kinds,
    /// or captures spread wider than the caller's tolerance.
    #[error("analysis: mismatched input: {detail}")]
    InputMismatch { detail: String },

    /// Fewer data points than the algorithm requires.
    #[error("analysis: insufficient data: {needed} {what} required, {got} supplied")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        got: usize,
    },
}

/// Convenience `Result` alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
