use crate::error::{EngineError, Result};
use chrono::Duration;
use netlens_common::types::{CompareOp, Threshold};
use netlens_storage::RetentionPolicy;
use serde::{Deserialize, Serialize};

/// Engine configuration, consumed as an already-parsed structure.
///
/// Every field carries a documented default, so a caller may supply any
/// subset of options; missing keys never fail. The orchestrator treats
/// the value as immutable for its lifetime; reconfiguring means
/// constructing a new orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Metric points and snapshots older than this are purged by the
    /// retention sweep.
    #[serde(default = "default_retention_max_age_secs")]
    pub retention_max_age_secs: u64,

    /// Per-series cap on retained points; unset leaves series unbounded
    /// up to the age limit.
    #[serde(default)]
    pub retention_max_points: Option<usize>,

    /// Consistency scores below this feed the correlator.
    #[serde(default = "default_consistency_min_score")]
    pub consistency_min_score: f64,

    /// Relative flatness tolerance for trend classification.
    #[serde(default = "default_trend_epsilon")]
    pub trend_epsilon: f64,

    /// Maximum capture-time spread tolerated across the snapshots of one
    /// comparison.
    #[serde(default = "default_snapshot_tolerance_secs")]
    pub snapshot_tolerance_secs: u64,

    /// Metric bounds checked by the trend detector.
    #[serde(default)]
    pub thresholds: Vec<ThresholdSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_max_age_secs: default_retention_max_age_secs(),
            retention_max_points: None,
            consistency_min_score: default_consistency_min_score(),
            trend_epsilon: default_trend_epsilon(),
            snapshot_tolerance_secs: default_snapshot_tolerance_secs(),
            thresholds: Vec::new(),
        }
    }
}

/// A threshold as supplied by external configuration. The comparator
/// arrives as a string and is validated when the orchestrator is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub metric: String,
    pub comparator: String,
    pub bound: f64,
}

fn default_retention_max_age_secs() -> u64 {
    7 * 86_400
}

fn default_consistency_min_score() -> f64 {
    0.9
}

fn default_trend_epsilon() -> f64 {
    netlens_analysis::trend::DEFAULT_EPSILON_REL
}

fn default_snapshot_tolerance_secs() -> u64 {
    120
}

impl EngineConfig {
    /// Parses and validates the configured thresholds.
    pub fn validated_thresholds(&self) -> Result<Vec<Threshold>> {
        self.thresholds
            .iter()
            .map(|spec| {
                let comparator: CompareOp = spec.comparator.parse().map_err(|_| {
                    EngineError::Configuration {
                        detail: format!(
                            "unknown comparator '{}' in threshold for metric '{}'",
                            spec.comparator, spec.metric
                        ),
                    }
                })?;
                Ok(Threshold {
                    metric_name: spec.metric.clone(),
                    comparator,
                    bound: spec.bound,
                })
            })
            .collect()
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age: Some(Duration::seconds(self.retention_max_age_secs as i64)),
            max_points: self.retention_max_points,
        }
    }

    pub fn snapshot_tolerance(&self) -> Duration {
        Duration::seconds(self.snapshot_tolerance_secs as i64)
    }
}
