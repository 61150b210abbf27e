// =============================================================================
// Trend-Line Validator
// =============================================================================
//
// A candidate line is anchored through (pivot, series[pivot]) and evaluated
// at every index:
//
//   diffs[i] = slope * i + intercept - series[i]
//
//   Support    -> valid iff max(diffs) <=  tolerance
//   Resistance -> valid iff min(diffs) >= -tolerance
//
// A valid line scores sum(diffs^2).  Invalid lines score `None`.
// =============================================================================

use super::types::{Line, Side};

/// Slack allowed on the wrong side of the data before a line is rejected.
/// Absorbs floating-point noise from the exact-pivot construction.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Score the line with `slope` through `(pivot, series[pivot])` as a bound on
/// `side` of `series`.
///
/// Returns `Some(sum of squared residuals)` for a valid bound and `None` when
/// any sample lies more than `tolerance` beyond the line, when `pivot` is out
/// of range, or when a residual is non-finite.
pub fn check_trend_line(
    side: Side,
    pivot: usize,
    slope: f64,
    series: &[f64],
    tolerance: f64,
) -> Option<f64> {
    if pivot >= series.len() {
        return None;
    }

    let line = Line::through_pivot(slope, pivot, series);
    let mut err = 0.0_f64;

    for (i, &y) in series.iter().enumerate() {
        let diff = line.value_at(i) - y;
        if !diff.is_finite() {
            return None;
        }
        let violates = match side {
            Side::Support => diff > tolerance,
            Side::Resistance => diff < -tolerance,
        };
        if violates {
            return None;
        }
        err += diff * diff;
    }

    Some(err)
}

/// [`check_trend_line`] with [`DEFAULT_TOLERANCE`].
pub fn validate_line(side: Side, pivot: usize, slope: f64, series: &[f64]) -> Option<f64> {
    check_trend_line(side, pivot, slope, series, DEFAULT_TOLERANCE)
}
