use crate::error::{AnalysisError, Result};
use chrono::Duration;
use netlens_common::types::{
    MetricPoint, SeriesId, Threshold, TimeWindow, TrendDirection, TrendResult,
};

/// Default relative flatness tolerance; see [`TrendOptions::epsilon_rel`].
pub const DEFAULT_EPSILON_REL: f64 = 0.05;

/// Tuning for [`detect`].
#[derive(Debug, Clone)]
pub struct TrendOptions {
    /// Relative flatness tolerance. The fitted slope counts as flat when
    /// its magnitude stays below `epsilon_rel × value_range / time_span`,
    /// which keeps the classification scale-invariant: the cutoff is
    /// derived from the series' own range, not an absolute unit.
    pub epsilon_rel: f64,
    /// How far past the last point to extrapolate the fitted line.
    /// `None` skips the forecast.
    pub forecast_horizon: Option<Duration>,
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            epsilon_rel: DEFAULT_EPSILON_REL,
            forecast_horizon: None,
        }
    }
}

/// Fits an ordinary least-squares line through `points` and classifies
/// the trend.
///
/// The regression runs over elapsed seconds, not sample index, so
/// irregular collection intervals weigh in correctly. Thresholds are
/// evaluated against the most recent point only, in input order; the
/// first breach wins. The optional forecast is a point estimate on the
/// fitted line; it carries no confidence interval.
pub fn detect(
    series_id: &SeriesId,
    points: &[MetricPoint],
    thresholds: &[Threshold],
    opts: &TrendOptions,
) -> Result<TrendResult> {
    if points.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            what: "metric points",
            needed: 2,
            got: points.len(),
        });
    }

    let first_ts = points.iter().map(|p| p.timestamp).min().unwrap_or_default();
    let last_ts = points.iter().map(|p| p.timestamp).max().unwrap_or_default();

    // y = mx + b with x = seconds since the earliest point
    let n = points.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    for p in points {
        let x = (p.timestamp - first_ts).num_milliseconds() as f64 / 1000.0;
        let y = p.value;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        // All points share one timestamp; no slope is definable.
        return Err(AnalysisError::InsufficientData {
            what: "distinct timestamps",
            needed: 2,
            got: 1,
        });
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    let min_value = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let max_value = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
    let value_range = max_value - min_value;
    let span_secs = (last_ts - first_ts).num_milliseconds() as f64 / 1000.0;

    let flat_cutoff = opts.epsilon_rel * value_range / span_secs;
    let direction = if value_range == 0.0 || slope.abs() < flat_cutoff {
        TrendDirection::Flat
    } else if slope > 0.0 {
        TrendDirection::Rising
    } else {
        TrendDirection::Falling
    };

    let latest = points
        .iter()
        .max_by_key(|p| p.timestamp)
        .copied()
        .unwrap_or(points[points.len() - 1]);
    let breached_threshold = thresholds
        .iter()
        .filter(|t| t.metric_name == series_id.metric_name)
        .find(|t| t.is_breached(latest.value))
        .cloned();

    let forecast_at_horizon = opts.forecast_horizon.map(|horizon| {
        let x = span_secs + horizon.num_milliseconds() as f64 / 1000.0;
        intercept + slope * x
    });

    Ok(TrendResult {
        series_id: series_id.clone(),
        window: TimeWindow {
            from: first_ts,
            to: last_ts,
        },
        slope,
        direction,
        breached_threshold,
        forecast_at_horizon,
    })
}
