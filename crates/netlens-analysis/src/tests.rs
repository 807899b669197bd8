use crate::consistency;
use crate::correlate::correlate;
use crate::error::AnalysisError;
use crate::trend::{detect, TrendOptions};
use chrono::{DateTime, Duration, Utc};
use netlens_common::types::{
    CompareOp, Confidence, MetricPoint, RuleEntry, RuleKind, RuleSnapshot, SeriesId, Threshold,
    TimeWindow, TrendDirection, TrendResult,
};

fn rule(src: &str) -> RuleEntry {
    RuleEntry::new(100, format!("ip4.src == {src}"), "reroute 172.16.0.1")
}

fn snapshot(node: &str, rules: &[RuleEntry]) -> RuleSnapshot {
    RuleSnapshot::new(node, Utc::now(), RuleKind::Lrp, rules.iter().cloned())
}

fn tolerance() -> Duration {
    Duration::seconds(120)
}

#[test]
fn identical_rule_sets_score_one() {
    let rules = vec![rule("10.244.1.5"), rule("10.244.2.9")];
    let snapshots = vec![
        snapshot("worker-0", &rules),
        snapshot("worker-1", &rules),
        snapshot("worker-2", &rules),
    ];

    let report = consistency::analyze(&snapshots, tolerance()).unwrap();
    assert_eq!(report.score, 1.0);
    assert!(report.is_uniform());
    assert_eq!(report.nodes, vec!["worker-0", "worker-1", "worker-2"]);
}

#[test]
fn lagging_node_halves_the_score() {
    let r1 = rule("10.244.1.5");
    let r2 = rule("10.244.2.9");
    let snapshots = vec![
        snapshot("n1", &[r1.clone(), r2.clone()]),
        snapshot("n2", &[r1.clone(), r2.clone()]),
        snapshot("n3", &[r1.clone()]),
    ];

    let report = consistency::analyze(&snapshots, tolerance()).unwrap();
    assert_eq!(report.score, 0.5);
    assert_eq!(report.missing.len(), 1);
    let n3_missing = report.missing.get("n3").unwrap();
    assert_eq!(n3_missing.len(), 1);
    assert!(n3_missing.contains(&r2));
    assert!(report.extra.is_empty());
}

#[test]
fn all_empty_rule_sets_are_vacuously_consistent() {
    let snapshots = vec![snapshot("n1", &[]), snapshot("n2", &[])];

    let report = consistency::analyze(&snapshots, tolerance()).unwrap();
    assert_eq!(report.score, 1.0);
    assert!(report.is_uniform());
}

#[test]
fn unique_rule_shows_up_as_extra() {
    let r1 = rule("10.244.1.5");
    let r2 = rule("10.244.2.9");
    let stray = rule("10.244.9.9");
    let snapshots = vec![
        snapshot("n1", &[r1.clone(), r2.clone(), stray.clone()]),
        snapshot("n2", &[r1.clone(), r2.clone()]),
        snapshot("n3", &[r1.clone(), r2.clone()]),
    ];

    let report = consistency::analyze(&snapshots, tolerance()).unwrap();
    assert_eq!(report.score, 2.0 / 3.0);
    assert_eq!(report.extra.get("n1").unwrap().len(), 1);
    assert!(report.extra.get("n1").unwrap().contains(&stray));
    // The other nodes miss the stray rule relative to the union
    assert!(report.missing.get("n2").unwrap().contains(&stray));
    assert!(report.missing.get("n3").unwrap().contains(&stray));
}

#[test]
fn removing_a_rule_never_raises_the_score() {
    let rules = vec![rule("10.244.1.5"), rule("10.244.2.9"), rule("10.244.3.3")];
    let baseline = vec![
        snapshot("n1", &rules),
        snapshot("n2", &rules),
        snapshot("n3", &rules),
    ];
    let baseline_score = consistency::analyze(&baseline, tolerance()).unwrap().score;

    for victim in &rules {
        let thinned: Vec<RuleEntry> = rules.iter().filter(|r| *r != victim).cloned().collect();
        let degraded = vec![
            snapshot("n1", &rules),
            snapshot("n2", &rules),
            snapshot("n3", &thinned),
        ];
        let degraded_score = consistency::analyze(&degraded, tolerance()).unwrap().score;
        assert!(degraded_score < baseline_score);
    }
}

#[test]
fn mixed_rule_kinds_are_rejected() {
    let entries = vec![rule("10.244.1.5")];
    let lrp = snapshot("n1", &entries);
    let snat = RuleSnapshot::new("n2", Utc::now(), RuleKind::Snat, entries);

    let err = consistency::analyze(&[lrp, snat], tolerance()).unwrap_err();
    assert!(matches!(err, AnalysisError::InputMismatch { .. }));
    assert!(err.to_string().contains("n2"));
}

#[test]
fn single_snapshot_is_rejected() {
    let err = consistency::analyze(&[snapshot("n1", &[])], tolerance()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InsufficientData { needed: 2, got: 1, .. }
    ));
}

#[test]
fn stale_capture_spread_is_rejected() {
    let entries = vec![rule("10.244.1.5")];
    let fresh = snapshot("n1", &entries);
    let stale = RuleSnapshot::new(
        "n2",
        Utc::now() - Duration::minutes(30),
        RuleKind::Lrp,
        entries,
    );

    let err = consistency::analyze(&[fresh, stale], tolerance()).unwrap_err();
    assert!(matches!(err, AnalysisError::InputMismatch { .. }));
}

fn series() -> SeriesId {
    SeriesId::new("net.latency_p99").with_label("node", "worker-0")
}

fn points_at(base: DateTime<Utc>, samples: &[(i64, f64)]) -> Vec<MetricPoint> {
    samples
        .iter()
        .map(|(secs, value)| MetricPoint::new(base + Duration::seconds(*secs), *value))
        .collect()
}

fn gt_threshold(metric: &str, bound: f64) -> Threshold {
    Threshold {
        metric_name: metric.to_string(),
        comparator: CompareOp::Gt,
        bound,
    }
}

#[test]
fn steady_increase_classifies_rising() {
    let base = Utc::now() - Duration::minutes(5);
    let points = points_at(base, &[(0, 1.0), (30, 2.0), (60, 3.0), (90, 4.0)]);

    let result = detect(&series(), &points, &[], &TrendOptions::default()).unwrap();
    assert_eq!(result.direction, TrendDirection::Rising);
    assert!(result.slope > 0.0);
    assert!(result.breached_threshold.is_none());
}

#[test]
fn constant_sequence_classifies_flat() {
    let base = Utc::now() - Duration::minutes(5);
    let points = points_at(base, &[(0, 42.0), (60, 42.0), (120, 42.0)]);

    let result = detect(&series(), &points, &[], &TrendOptions::default()).unwrap();
    assert_eq!(result.direction, TrendDirection::Flat);
    assert_eq!(result.slope, 0.0);
}

#[test]
fn balanced_noise_classifies_flat() {
    let base = Utc::now() - Duration::minutes(5);
    let points = points_at(
        base,
        &[(0, 10.0), (60, 11.0), (120, 10.0), (180, 11.0), (240, 10.0)],
    );

    let result = detect(&series(), &points, &[], &TrendOptions::default()).unwrap();
    assert_eq!(result.direction, TrendDirection::Flat);
}

#[test]
fn slope_and_breach_on_ramping_series() {
    let base = Utc::now() - Duration::minutes(5);
    let points = points_at(base, &[(0, 10.0), (60, 20.0), (120, 30.0)]);
    let thresholds = vec![gt_threshold("net.latency_p99", 25.0)];

    let result = detect(&series(), &points, &thresholds, &TrendOptions::default()).unwrap();
    assert!((result.slope - 1.0 / 6.0).abs() < 1e-9);
    assert_eq!(result.direction, TrendDirection::Rising);
    let breached = result.breached_threshold.unwrap();
    assert_eq!(breached.bound, 25.0);
    assert_eq!(result.window.from, base);
    assert_eq!(result.window.to, base + Duration::seconds(120));
}

#[test]
fn decline_classifies_falling() {
    let base = Utc::now() - Duration::minutes(5);
    let points = points_at(base, &[(0, 30.0), (60, 20.0), (120, 10.0)]);

    let result = detect(&series(), &points, &[], &TrendOptions::default()).unwrap();
    assert_eq!(result.direction, TrendDirection::Falling);
    assert!(result.slope < 0.0);
}

#[test]
fn fewer_than_two_points_is_rejected() {
    let base = Utc::now();
    let err = detect(
        &series(),
        &points_at(base, &[(0, 1.0)]),
        &[],
        &TrendOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { .. }));
}

#[test]
fn coincident_timestamps_are_rejected() {
    let base = Utc::now();
    let err = detect(
        &series(),
        &points_at(base, &[(0, 1.0), (0, 2.0)]),
        &[],
        &TrendOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { .. }));
}

#[test]
fn first_matching_threshold_wins() {
    let base = Utc::now() - Duration::minutes(5);
    let points = points_at(base, &[(0, 10.0), (60, 20.0), (120, 30.0)]);
    let thresholds = vec![
        gt_threshold("disk.used_percent", 5.0), // other metric, ignored
        gt_threshold("net.latency_p99", 20.0),
        gt_threshold("net.latency_p99", 25.0), // also breached, but second
    ];

    let result = detect(&series(), &points, &thresholds, &TrendOptions::default()).unwrap();
    assert_eq!(result.breached_threshold.unwrap().bound, 20.0);
}

#[test]
fn forecast_extrapolates_the_fitted_line() {
    let base = Utc::now() - Duration::minutes(5);
    let points = points_at(base, &[(0, 10.0), (60, 20.0), (120, 30.0)]);
    let opts = TrendOptions {
        forecast_horizon: Some(Duration::seconds(60)),
        ..TrendOptions::default()
    };

    let result = detect(&series(), &points, &[], &opts).unwrap();
    let forecast = result.forecast_at_horizon.unwrap();
    assert!((forecast - 40.0).abs() < 1e-9);
}

fn degraded_report(evaluated_at: DateTime<Utc>) -> netlens_common::types::ConsistencyReport {
    netlens_common::types::ConsistencyReport {
        evaluated_at,
        rule_kind: RuleKind::Snat,
        nodes: vec!["n1".into(), "n2".into()],
        missing: Default::default(),
        extra: Default::default(),
        score: 0.5,
    }
}

fn breached_trend(window_end: DateTime<Utc>) -> TrendResult {
    TrendResult {
        series_id: series(),
        window: TimeWindow {
            from: window_end - Duration::minutes(10),
            to: window_end,
        },
        slope: 0.2,
        direction: TrendDirection::Rising,
        breached_threshold: Some(gt_threshold("net.latency_p99", 25.0)),
        forecast_at_horizon: None,
    }
}

#[test]
fn simultaneous_signals_correlate_with_high_confidence() {
    let now = Utc::now();
    let candidates = correlate(
        &degraded_report(now),
        &[breached_trend(now - Duration::seconds(10))],
        Duration::minutes(10),
        0.9,
    );

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].confidence, Confidence::High);
    assert!(candidates[0].signal_a.contains("consistency"));
    assert!(candidates[0].signal_b.contains("net.latency_p99"));
}

#[test]
fn outer_half_of_the_window_downgrades_confidence() {
    let now = Utc::now();
    let candidates = correlate(
        &degraded_report(now),
        &[breached_trend(now - Duration::minutes(8))],
        Duration::minutes(10),
        0.9,
    );

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].confidence, Confidence::Low);
}

#[test]
fn no_candidate_without_both_conditions() {
    let now = Utc::now();

    // Healthy consistency score
    assert!(correlate(
        &netlens_common::types::ConsistencyReport {
            score: 0.95,
            ..degraded_report(now)
        },
        &[breached_trend(now)],
        Duration::minutes(10),
        0.9,
    )
    .is_empty());

    // No threshold breach
    let calm = TrendResult {
        breached_threshold: None,
        ..breached_trend(now)
    };
    assert!(correlate(&degraded_report(now), &[calm], Duration::minutes(10), 0.9).is_empty());

    // Breach outside the co-occurrence window
    assert!(correlate(
        &degraded_report(now),
        &[breached_trend(now - Duration::hours(2))],
        Duration::minutes(10),
        0.9,
    )
    .is_empty());
}
