//! Shared value types for the rule-consistency and metric-trend engines.
//!
//! Everything here is a plain data type: rule snapshots and their canonical
//! entries, metric points and series identities, thresholds, and the report
//! types produced by the analysis crates. No I/O happens in this crate.

pub mod id;
pub mod types;
