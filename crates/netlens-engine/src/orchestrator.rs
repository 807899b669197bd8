use crate::config::EngineConfig;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use netlens_analysis::trend::TrendOptions;
use netlens_analysis::{consistency, correlate, trend};
use netlens_common::types::{
    Candidate, ConsistencyReport, MetricPoint, RuleKind, RuleSnapshot, SeriesId, Threshold,
    TrendResult,
};
use netlens_storage::engine::SqliteMetricStore;
use netlens_storage::snapshot_store::SnapshotStore;
use netlens_storage::MetricStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One requested trend computation: a series, a time range, and an
/// optional forecast horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRangeQuery {
    pub series: SeriesId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default)]
    pub forecast_horizon_secs: Option<u64>,
}

/// A full analysis request from the outer dispatch layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub rule_kind: RuleKind,
    pub nodes: Vec<String>,
    pub metric_queries: Vec<MetricRangeQuery>,
    pub co_occurrence_window_secs: u64,
}

/// The assembled response: consistency, trends, and correlation
/// candidates from one synchronous pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_id: String,
    pub consistency: ConsistencyReport,
    pub trends: Vec<TrendResult>,
    pub candidates: Vec<Candidate>,
}

/// Counts from one retention sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionSweep {
    pub points_purged: u64,
    pub snapshots_purged: u64,
}

/// Coordinates ingestion write-through and analysis fan-out.
///
/// Construction validates the configured thresholds and opens the
/// stores; afterwards the configuration is immutable, so several
/// independent orchestrators (one per cluster, say) can coexist in a
/// process. All methods take `&self` and are safe to call concurrently.
pub struct Orchestrator {
    metrics: Arc<dyn MetricStore>,
    snapshots: SnapshotStore,
    thresholds: Vec<Threshold>,
    config: EngineConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("thresholds", &self.thresholds)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(config: EngineConfig, data_dir: &Path) -> Result<Self> {
        let thresholds = config.validated_thresholds()?;
        let metrics: Arc<dyn MetricStore> = Arc::new(SqliteMetricStore::open(data_dir)?);
        let snapshots = SnapshotStore::open(data_dir)?;
        tracing::info!(
            thresholds = thresholds.len(),
            retention_max_age_secs = config.retention_max_age_secs,
            "Orchestrator ready"
        );
        Ok(Self {
            metrics,
            snapshots,
            thresholds,
            config,
        })
    }

    /// Records a node's rule state and derives its `rule.count` metric
    /// point, so rule-count history trends like any other series.
    pub fn push_snapshot(&self, snapshot: &RuleSnapshot) -> Result<()> {
        self.snapshots.put(snapshot)?;

        let series = rule_count_series(&snapshot.node_id, snapshot.rule_kind);
        self.metrics.append(
            &series,
            MetricPoint::new(snapshot.captured_at, snapshot.rule_count() as f64),
        )?;
        tracing::debug!(
            node = %snapshot.node_id,
            kind = %snapshot.rule_kind,
            rules = snapshot.rule_count(),
            "Recorded rule snapshot"
        );
        Ok(())
    }

    /// Writes one metric sample through to the store.
    pub fn push_metric(&self, series: &SeriesId, point: MetricPoint) -> Result<()> {
        self.metrics.append(series, point)?;
        Ok(())
    }

    /// Runs one synchronous analysis pass and assembles the report.
    ///
    /// Consistency runs over the latest stored snapshot of each
    /// requested node; each metric query becomes one trend result; the
    /// correlator joins the two. Any unmet precondition aborts the whole
    /// request with a typed error.
    pub fn request_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let mut node_snapshots = Vec::with_capacity(request.nodes.len());
        for node in &request.nodes {
            node_snapshots.push(self.snapshots.require_latest(node, request.rule_kind)?);
        }
        let consistency =
            consistency::analyze(&node_snapshots, self.config.snapshot_tolerance())?;

        let mut trends = Vec::with_capacity(request.metric_queries.len());
        for query in &request.metric_queries {
            let points = self.metrics.query(&query.series, query.from, query.to)?;
            let opts = TrendOptions {
                epsilon_rel: self.config.trend_epsilon,
                forecast_horizon: query
                    .forecast_horizon_secs
                    .map(|secs| Duration::seconds(secs as i64)),
            };
            trends.push(trend::detect(&query.series, &points, &self.thresholds, &opts)?);
        }

        let candidates = correlate::correlate(
            &consistency,
            &trends,
            Duration::seconds(request.co_occurrence_window_secs as i64),
            self.config.consistency_min_score,
        );

        let report = AnalysisReport {
            report_id: netlens_common::id::next_id(),
            consistency,
            trends,
            candidates,
        };
        tracing::info!(
            report_id = %report.report_id,
            score = report.consistency.score,
            trends = report.trends.len(),
            candidates = report.candidates.len(),
            "Analysis complete"
        );
        Ok(report)
    }

    /// Applies the configured retention bounds to both stores. Driven by
    /// an external scheduler.
    pub fn sweep_retention(&self) -> Result<RetentionSweep> {
        let policy = self.config.retention_policy();
        let points_purged = self.metrics.retain(&policy)?;
        let snapshots_purged = self
            .snapshots
            .prune(Duration::seconds(self.config.retention_max_age_secs as i64))?;
        Ok(RetentionSweep {
            points_purged,
            snapshots_purged,
        })
    }
}

/// Series identity for the derived per-node rule-count metric.
pub fn rule_count_series(node_id: &str, rule_kind: RuleKind) -> SeriesId {
    SeriesId::new("rule.count")
        .with_label("node", node_id)
        .with_label("kind", rule_kind.to_string())
}
