// =============================================================================
// Initial Fit Estimator — least-squares trend and pivot selection
// =============================================================================
//
// Ordinary least squares of price on sample index:
//
//   slope     = Σ((x - x̄)(y - ȳ)) / Σ((x - x̄)²)
//   intercept = ȳ - slope * x̄
//
// Residuals against the fitted line pick the anchors for the bound lines:
//
//   support pivot    = argmin(lows  - fitted)
//   resistance pivot = argmax(highs - fitted)
//
// In single-series mode lows and highs are the series itself.  In high-low
// mode the regression runs on closes while the pivots are measured against
// the low and high series, so the bounds anchor on intraday extremes while
// the starting trend follows closing prices.
//
// Ties resolve to the first index.
// =============================================================================

use tracing::debug;

use super::error::{ensure_usable, Result, TrendlineError};
use super::types::{InitialFit, Line};

/// Least-squares fit of `series` against its index.  Callers guarantee at
/// least two samples.
fn least_squares(series: &[f64]) -> Line {
    let n = series.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = series.iter().sum::<f64>() / n;

    let mut numerator = 0.0_f64;
    let mut denominator = 0.0_f64;
    for (i, &y) in series.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }

    let slope = numerator / denominator;
    Line::new(slope, y_mean - slope * x_mean)
}

/// Index of the smallest `series[i] - line(i)`, first one on ties.
fn argmin_residual(series: &[f64], line: &Line) -> usize {
    let mut best = 0;
    let mut best_val = f64::INFINITY;
    for (i, &y) in series.iter().enumerate() {
        let r = y - line.value_at(i);
        if r < best_val {
            best_val = r;
            best = i;
        }
    }
    best
}

/// Index of the largest `series[i] - line(i)`, first one on ties.
fn argmax_residual(series: &[f64], line: &Line) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &y) in series.iter().enumerate() {
        let r = y - line.value_at(i);
        if r > best_val {
            best_val = r;
            best = i;
        }
    }
    best
}

/// Regress `series` on its index and locate both pivots against the same
/// series.
pub fn estimate_initial_fit(series: &[f64]) -> Result<InitialFit> {
    ensure_usable(series, "price")?;

    let line = least_squares(series);
    let fit = InitialFit {
        slope: line.slope,
        intercept: line.intercept,
        support_pivot: argmin_residual(series, &line),
        resistance_pivot: argmax_residual(series, &line),
    };

    debug!(
        len = series.len(),
        slope = fit.slope,
        intercept = fit.intercept,
        support_pivot = fit.support_pivot,
        resistance_pivot = fit.resistance_pivot,
        "initial fit estimated"
    );
    Ok(fit)
}

/// Regress `close` on its index; pick the support pivot against `low` and the
/// resistance pivot against `high`.
pub fn estimate_initial_fit_high_low(high: &[f64], low: &[f64], close: &[f64]) -> Result<InitialFit> {
    ensure_usable(close, "close")?;
    ensure_usable(low, "low")?;
    ensure_usable(high, "high")?;
    if high.len() != close.len() || low.len() != close.len() {
        return Err(TrendlineError::degenerate(format!(
            "high/low/close lengths differ ({}/{}/{})",
            high.len(),
            low.len(),
            close.len()
        )));
    }

    let line = least_squares(close);
    let fit = InitialFit {
        slope: line.slope,
        intercept: line.intercept,
        support_pivot: argmin_residual(low, &line),
        resistance_pivot: argmax_residual(high, &line),
    };

    debug!(
        len = close.len(),
        slope = fit.slope,
        intercept = fit.intercept,
        support_pivot = fit.support_pivot,
        resistance_pivot = fit.resistance_pivot,
        "initial high-low fit estimated"
    );
    Ok(fit)
}
