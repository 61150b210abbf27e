// =============================================================================
// Trend-Line Fitter
// =============================================================================
//
// Pipeline shared by both entry points:
//
//   1. Least-squares fit for the starting slope and the two pivots.
//   2. Optimise the support slope through the support pivot (series or lows).
//   3. Optimise the resistance slope through the resistance pivot (series or
//      highs).
//
// The two optimisations are independent of each other.
// =============================================================================

use tracing::info;

use super::error::Result;
use super::initial_fit::{estimate_initial_fit, estimate_initial_fit_high_low};
use super::optimizer::{optimize_slope_with, FitParams};
use super::types::{FitResult, InitialFit, Side, SlopeFit};

/// Full outcome of a fit, keeping the starting estimate and per-side search
/// details alongside the final lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendlineFit {
    pub initial: InitialFit,
    pub support: SlopeFit,
    pub resistance: SlopeFit,
}

impl TrendlineFit {
    pub fn lines(&self) -> FitResult {
        FitResult {
            support: self.support.line,
            resistance: self.resistance.line,
        }
    }
}

/// Fits support and resistance lines with a fixed set of [`FitParams`].
#[derive(Debug, Clone, Default)]
pub struct TrendlineFitter {
    params: FitParams,
}

impl TrendlineFitter {
    pub fn new(params: FitParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FitParams {
        &self.params
    }

    /// Fit both bounds to a single price series.
    pub fn fit_series(&self, series: &[f64]) -> Result<TrendlineFit> {
        let initial = estimate_initial_fit(series)?;
        self.optimise_both(initial, series, series)
    }

    /// Fit the support to `low` and the resistance to `high`, starting from
    /// the trend of `close`.
    pub fn fit_high_low(&self, high: &[f64], low: &[f64], close: &[f64]) -> Result<TrendlineFit> {
        let initial = estimate_initial_fit_high_low(high, low, close)?;
        self.optimise_both(initial, low, high)
    }

    fn optimise_both(&self, initial: InitialFit, lows: &[f64], highs: &[f64]) -> Result<TrendlineFit> {
        let support = optimize_slope_with(
            &self.params,
            Side::Support,
            initial.support_pivot,
            initial.slope,
            lows,
        )?;
        let resistance = optimize_slope_with(
            &self.params,
            Side::Resistance,
            initial.resistance_pivot,
            initial.slope,
            highs,
        )?;

        info!(
            len = lows.len(),
            support_slope = support.line.slope,
            support_pivot = support.pivot,
            resistance_slope = resistance.line.slope,
            resistance_pivot = resistance.pivot,
            "trend lines fitted"
        );

        Ok(TrendlineFit {
            initial,
            support,
            resistance,
        })
    }
}

/// Fit support and resistance lines to one price series with default
/// parameters.
pub fn fit_trendlines(series: &[f64]) -> Result<FitResult> {
    TrendlineFitter::default()
        .fit_series(series)
        .map(|fit| fit.lines())
}

/// Fit support to `low` and resistance to `high`, with the starting trend
/// taken from `close`, using default parameters.
pub fn fit_trendlines_high_low(high: &[f64], low: &[f64], close: &[f64]) -> Result<FitResult> {
    TrendlineFitter::default()
        .fit_high_low(high, low, close)
        .map(|fit| fit.lines())
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::trendline::error::TrendlineError;
    use crate::trendline::types::Line;
    use crate::trendline::validator::DEFAULT_TOLERANCE;

    fn max_overshoot(line: &Line, series: &[f64]) -> f64 {
        (0..series.len())
            .map(|i| line.value_at(i) - series[i])
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn max_undershoot(line: &Line, series: &[f64]) -> f64 {
        (0..series.len())
            .map(|i| line.value_at(i) - series[i])
            .fold(f64::INFINITY, f64::min)
    }

    /// Deterministic price path with trend, cycle and a few shocks.
    fn price_path(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                let shock = if i % 17 == 5 { -4.0 } else if i % 23 == 11 { 5.0 } else { 0.0 };
                250.0 - 0.3 * x + (x / 6.0).sin() * 8.0 + shock
            })
            .collect()
    }

    #[test]
    fn linear_ramp_is_hugged_by_both_lines() {
        let ramp: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let fit = TrendlineFitter::default().fit_series(&ramp).unwrap();

        assert_eq!(fit.initial.slope, 1.0);
        assert_eq!(fit.initial.intercept, 0.0);
        for side in [&fit.support, &fit.resistance] {
            assert!((side.line.slope - 1.0).abs() < 1e-6, "{side:?}");
            assert!(side.line.intercept.abs() < 1e-6, "{side:?}");
            assert!(side.error < 1e-9, "{side:?}");
        }
    }

    #[test]
    fn oscillating_series_bounds_touch_troughs_and_peaks() {
        let wave = [1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0];
        let fit = TrendlineFitter::default().fit_series(&wave).unwrap();

        assert_eq!(wave[fit.support.pivot], 1.0);
        assert_eq!(wave[fit.resistance.pivot], 2.0);
        assert!((fit.support.line.value_at(fit.support.pivot) - 1.0).abs() < 1e-12);
        assert!((fit.resistance.line.value_at(fit.resistance.pivot) - 2.0).abs() < 1e-12);

        assert!(max_overshoot(&fit.support.line, &wave) <= DEFAULT_TOLERANCE);
        assert!(max_undershoot(&fit.resistance.line, &wave) >= -DEFAULT_TOLERANCE);

        // Both lines end up essentially flat.
        assert!(fit.support.line.slope.abs() < 1e-3);
        assert!(fit.resistance.line.slope.abs() < 1e-3);
    }

    #[test]
    fn single_sample_is_degenerate() {
        let err = fit_trendlines(&[42.0]).unwrap_err();
        assert!(matches!(err, TrendlineError::DegenerateInput { .. }));
    }

    #[test]
    fn constant_series_is_degenerate() {
        let err = fit_trendlines(&[7.0; 12]).unwrap_err();
        assert!(matches!(err, TrendlineError::DegenerateInput { .. }));
    }

    #[test]
    fn high_low_mode_anchors_on_extremes() {
        let high = [2.0, 3.0, 2.0, 3.0];
        let low = [1.0, 2.0, 1.0, 2.0];
        let close = [1.5, 2.5, 1.5, 2.5];
        let fit = TrendlineFitter::default()
            .fit_high_low(&high, &low, &close)
            .unwrap();

        assert!((fit.initial.slope - 0.2).abs() < 1e-12);
        assert_eq!(fit.support.pivot, 2);
        assert_eq!(fit.resistance.pivot, 1);

        // Support through low[2] = 1, resistance through high[1] = 3, both
        // optimised to flat lines.
        assert!(fit.support.line.slope.abs() < 1e-3);
        assert!((fit.support.line.intercept - 1.0).abs() < 1e-2);
        assert!(fit.resistance.line.slope.abs() < 1e-3);
        assert!((fit.resistance.line.intercept - 3.0).abs() < 1e-2);

        assert!(max_overshoot(&fit.support.line, &low) <= DEFAULT_TOLERANCE);
        assert!(max_undershoot(&fit.resistance.line, &high) >= -DEFAULT_TOLERANCE);
    }

    #[test]
    fn realistic_path_produces_valid_bounds() {
        let closes = price_path(200);
        let lines = fit_trendlines(&closes).unwrap();
        assert!(max_overshoot(&lines.support, &closes) <= DEFAULT_TOLERANCE + 1e-9);
        assert!(max_undershoot(&lines.resistance, &closes) >= -DEFAULT_TOLERANCE - 1e-9);
        // Resistance never sits below support over the window.
        for i in 0..closes.len() {
            assert!(lines.resistance.value_at(i) >= lines.support.value_at(i) - 2.0 * DEFAULT_TOLERANCE);
        }
    }

    #[test]
    fn high_low_path_bounds_respective_series() {
        let closes = price_path(120);
        let highs: Vec<f64> = closes.iter().enumerate().map(|(i, c)| c + 1.0 + (i % 3) as f64).collect();
        let lows: Vec<f64> = closes.iter().enumerate().map(|(i, c)| c - 1.0 - (i % 4) as f64).collect();
        let lines = fit_trendlines_high_low(&highs, &lows, &closes).unwrap();
        assert!(max_overshoot(&lines.support, &lows) <= DEFAULT_TOLERANCE + 1e-9);
        assert!(max_undershoot(&lines.resistance, &highs) >= -DEFAULT_TOLERANCE - 1e-9);
    }

    #[test]
    fn fitting_is_deterministic() {
        let closes = price_path(150);
        assert_eq!(fit_trendlines(&closes).unwrap(), fit_trendlines(&closes).unwrap());
    }

    #[test]
    fn free_function_matches_fitter_lines() {
        let closes = price_path(64);
        let detailed = TrendlineFitter::new(FitParams::default()).fit_series(&closes).unwrap();
        assert_eq!(fit_trendlines(&closes).unwrap(), detailed.lines());
    }

    #[test]
    fn fitter_rejects_unusable_params() {
        let fitter = TrendlineFitter::new(FitParams {
            min_step: 0.0,
            ..FitParams::default()
        });
        let err = fitter.fit_series(&price_path(50)).unwrap_err();
        assert!(matches!(err, TrendlineError::InvalidParams { .. }));
    }

}
