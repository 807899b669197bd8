use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of network rule held by a node: source NAT entries or
/// logical-router policies.
///
/// # Examples
///
/// ```
/// use netlens_common::types::RuleKind;
///
/// let kind: RuleKind = "snat".parse().unwrap();
/// assert_eq!(kind, RuleKind::Snat);
/// assert_eq!(kind.to_string(), "snat");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Snat,
    Lrp,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Snat => write!(f, "snat"),
            RuleKind::Lrp => write!(f, "lrp"),
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snat" => Ok(RuleKind::Snat),
            "lrp" => Ok(RuleKind::Lrp),
            _ => Err(format!("unknown rule kind: {s}")),
        }
    }
}

/// One normalized rule entry: match criteria, action, and priority.
///
/// Entries are value types ordered by priority first, so a `BTreeSet` of
/// them lists the way a router would evaluate them. The [`canonical`]
/// string is the stable wire/storage form and doubles as the equality key
/// across nodes.
///
/// [`canonical`]: RuleEntry::canonical
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleEntry {
    pub priority: i64,
    pub match_criteria: String,
    pub action: String,
}

impl RuleEntry {
    pub fn new(priority: i64, match_criteria: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            priority,
            match_criteria: match_criteria.into(),
            action: action.into(),
        }
    }

    /// Stable canonical form: `priority|match|action`.
    pub fn canonical(&self) -> String {
        format!("{}|{}|{}", self.priority, self.match_criteria, self.action)
    }
}

/// One node's rule state of a single kind at one point in time.
///
/// Immutable once constructed. Duplicate entries (identical canonical
/// form) collapse during construction because the rules live in a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub node_id: String,
    pub captured_at: DateTime<Utc>,
    pub rule_kind: RuleKind,
    pub rules: BTreeSet<RuleEntry>,
}

impl RuleSnapshot {
    pub fn new(
        node_id: impl Into<String>,
        captured_at: DateTime<Utc>,
        rule_kind: RuleKind,
        rules: impl IntoIterator<Item = RuleEntry>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            captured_at,
            rule_kind,
            rules: rules.into_iter().collect(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// A single observation in a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Identity of a metric series: a metric name plus disambiguating labels.
///
/// The rendered form (`name{k=v, ...}`) is the storage key, so label
/// ordering must be stable, hence the `BTreeMap`.
///
/// # Examples
///
/// ```
/// use netlens_common::types::SeriesId;
///
/// let series = SeriesId::new("net.latency_p99").with_label("node", "worker-0");
/// assert_eq!(series.to_string(), "net.latency_p99{node=worker-0}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesId {
    pub metric_name: String,
    pub labels: BTreeMap<String, String>,
}

impl SeriesId {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.labels.is_empty() {
            return write!(f, "{}", self.metric_name);
        }
        let pairs: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}{{{}}}", self.metric_name, pairs.join(", "))
    }
}

/// Comparison operator used by thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Lt,
    Gt,
    Gte,
    Lte,
}

impl std::str::FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lt" | "less_than" => Ok(Self::Lt),
            "gt" | "greater_than" => Ok(Self::Gt),
            "gte" | "greater_equal" => Ok(Self::Gte),
            "lte" | "less_equal" => Ok(Self::Lte),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lt => write!(f, "lt"),
            Self::Gt => write!(f, "gt"),
            Self::Gte => write!(f, "gte"),
            Self::Lte => write!(f, "lte"),
        }
    }
}

impl CompareOp {
    pub fn check(&self, value: f64, bound: f64) -> bool {
        match self {
            Self::Lt => value < bound,
            Self::Gt => value > bound,
            Self::Gte => value >= bound,
            Self::Lte => value <= bound,
        }
    }
}

/// A bound on a metric, supplied by external configuration. Read-only to
/// the analysis code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric_name: String,
    pub comparator: CompareOp,
    pub bound: f64,
}

impl Threshold {
    pub fn is_breached(&self, value: f64) -> bool {
        self.comparator.check(value, self.bound)
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.metric_name, self.comparator, self.bound)
    }
}

/// Result of comparing rule snapshots across a node set.
///
/// `missing[node]` holds rules absent on that node but present elsewhere;
/// `extra[node]` holds rules only that node carries. Nodes with empty
/// anomaly sets are omitted from the maps. `nodes` preserves the caller's
/// input order and implies no ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub evaluated_at: DateTime<Utc>,
    pub rule_kind: RuleKind,
    pub nodes: Vec<String>,
    pub missing: BTreeMap<String, BTreeSet<RuleEntry>>,
    pub extra: BTreeMap<String, BTreeSet<RuleEntry>>,
    /// Intersection-over-union of the node rule sets, in `[0, 1]`.
    pub score: f64,
}

impl ConsistencyReport {
    /// True when every node holds exactly the same rule set.
    pub fn is_uniform(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Closed time interval covered by an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Direction of a fitted metric trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Rising => write!(f, "rising"),
            TrendDirection::Falling => write!(f, "falling"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}

/// Fitted trend over one metric series. Derived per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResult {
    pub series_id: SeriesId,
    /// Span of the analyzed points; `window.to` is the instant the trend
    /// signal pertains to.
    pub window: TimeWindow,
    /// Least-squares slope in value units per second.
    pub slope: f64,
    pub direction: TrendDirection,
    /// First configured threshold breached by the most recent point.
    pub breached_threshold: Option<Threshold>,
    /// Linear extrapolation at the requested horizon. A point estimate
    /// with no confidence interval.
    pub forecast_at_horizon: Option<f64>,
}

/// Qualitative co-occurrence confidence. Not a statistical measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// A root-cause candidate: two signals that co-occurred in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub signal_a: String,
    pub signal_b: String,
    pub confidence: Confidence,
}
