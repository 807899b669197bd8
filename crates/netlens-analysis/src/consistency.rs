use crate::error::{AnalysisError, Result};
use chrono::{Duration, Utc};
use netlens_common::types::{ConsistencyReport, RuleEntry, RuleSnapshot};
use std::collections::{BTreeMap, BTreeSet};

/// Compares rule snapshots across a node set and scores their agreement.
///
/// All snapshots must share one rule kind, and their capture times must
/// lie within `tolerance` of each other. Comparing a fresh capture
/// against a stale one would report phantom drift, so a wide spread is
/// rejected rather than silently scored.
///
/// The score is intersection-over-union of the canonical rule sets:
/// `1.0` when every node agrees (vacuously so when no node holds any
/// rule), shrinking symmetrically as rules go missing on some nodes or
/// appear on only one. `missing[node]` is measured against the union;
/// `extra[node]` holds rules no other node carries, so a node that
/// lags and a node that leads both show up. A single outlier among
/// many agreeing nodes still scores close to 1; the ratio is not
/// weighted by node count.
pub fn analyze(snapshots: &[RuleSnapshot], tolerance: Duration) -> Result<ConsistencyReport> {
    if snapshots.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            what: "rule snapshots",
            needed: 2,
            got: snapshots.len(),
        });
    }

    let rule_kind = snapshots[0].rule_kind;
    if let Some(odd) = snapshots.iter().find(|s| s.rule_kind != rule_kind) {
        return Err(AnalysisError::InputMismatch {
            detail: format!(
                "node '{}' supplied {} rules in a {} comparison",
                odd.node_id, odd.rule_kind, rule_kind
            ),
        });
    }

    let oldest = snapshots.iter().map(|s| s.captured_at).min().unwrap_or_default();
    let newest = snapshots.iter().map(|s| s.captured_at).max().unwrap_or_default();
    if newest - oldest > tolerance {
        return Err(AnalysisError::InputMismatch {
            detail: format!(
                "captures spread over {}s exceed the {}s tolerance",
                (newest - oldest).num_seconds(),
                tolerance.num_seconds()
            ),
        });
    }

    let union: BTreeSet<&RuleEntry> = snapshots.iter().flat_map(|s| s.rules.iter()).collect();
    let intersection: BTreeSet<&RuleEntry> = union
        .iter()
        .copied()
        .filter(|entry| snapshots.iter().all(|s| s.rules.contains(*entry)))
        .collect();

    let mut missing = BTreeMap::new();
    let mut extra = BTreeMap::new();
    for snapshot in snapshots {
        let absent: BTreeSet<RuleEntry> = union
            .iter()
            .copied()
            .filter(|entry| !snapshot.rules.contains(*entry))
            .cloned()
            .collect();
        if !absent.is_empty() {
            missing.insert(snapshot.node_id.clone(), absent);
        }

        // Extra means unique: held here and on no other node.
        let surplus: BTreeSet<RuleEntry> = snapshot
            .rules
            .iter()
            .filter(|entry| {
                snapshots
                    .iter()
                    .filter(|other| other.node_id != snapshot.node_id)
                    .all(|other| !other.rules.contains(*entry))
            })
            .cloned()
            .collect();
        if !surplus.is_empty() {
            extra.insert(snapshot.node_id.clone(), surplus);
        }
    }

    let score = if union.is_empty() {
        1.0
    } else {
        intersection.len() as f64 / union.len() as f64
    };

    Ok(ConsistencyReport {
        evaluated_at: Utc::now(),
        rule_kind,
        nodes: snapshots.iter().map(|s| s.node_id.clone()).collect(),
        missing,
        extra,
        score,
    })
}
