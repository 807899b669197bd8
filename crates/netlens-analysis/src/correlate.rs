use chrono::Duration;
use netlens_common::types::{Candidate, Confidence, ConsistencyReport, TrendResult};

/// Joins a consistency report with trend results and surfaces
/// co-occurring anomalies as root-cause candidates.
///
/// A candidate is emitted only when a trend breached its threshold, the
/// consistency score sits below `min_score`, and the two signals were
/// evaluated within `window` of each other. Confidence is `high` inside
/// the narrower half of the window, `low` in the outer half. This is a
/// rule-based flag for human or agent review; it never asserts
/// causation.
pub fn correlate(
    consistency: &ConsistencyReport,
    trends: &[TrendResult],
    window: Duration,
    min_score: f64,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if consistency.score >= min_score {
        return candidates;
    }

    for trend in trends {
        let Some(threshold) = &trend.breached_threshold else {
            continue;
        };
        let gap = (trend.window.to - consistency.evaluated_at).abs();
        if gap > window {
            continue;
        }

        let confidence = if gap <= window / 2 {
            Confidence::High
        } else {
            Confidence::Low
        };
        let candidate = Candidate {
            signal_a: format!(
                "{} rule consistency {:.2} below minimum {:.2}",
                consistency.rule_kind, consistency.score, min_score
            ),
            signal_b: format!(
                "{} {} with {} breached",
                trend.series_id, trend.direction, threshold
            ),
            confidence,
        };
        tracing::debug!(
            series = %trend.series_id,
            confidence = %candidate.confidence,
            "Correlated consistency regression with trend breach"
        );
        candidates.push(candidate);
    }

    candidates
}
