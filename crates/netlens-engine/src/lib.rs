//! Analysis orchestrator: the seam between external collectors and the
//! analytical core.
//!
//! Collectors push rule snapshots and metric samples in; an outer
//! tool-dispatch layer asks for analysis out. The [`Orchestrator`] owns
//! the stores, fans a request out to the consistency analyzer, trend
//! detector, and correlator, and assembles one report. It holds no
//! background task; collection cadence and retention scheduling belong
//! to the caller.
//!
//! [`Orchestrator`]: orchestrator::Orchestrator

pub mod config;
pub mod error;
pub mod orchestrator;


pub use config::EngineConfig;
pub use error::EngineError;
pub use orchestrator::{AnalysisReport, AnalysisRequest, MetricRangeQuery, Orchestrator};
