//! Analytical core: rule-set consistency scoring, metric trend fitting,
//! and rule-based co-occurrence correlation.
//!
//! Every function here is pure over caller-supplied immutable inputs and
//! holds no state across calls, so all of them are safe to invoke
//! concurrently without limit. A failed computation is always a typed
//! [`error::AnalysisError`], never a partial or default report.

pub mod consistency;
pub mod correlate;
pub mod error;
pub mod trend;

#[cfg(test)]
mod tests;
