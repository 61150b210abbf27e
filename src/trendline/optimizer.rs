// =============================================================================
// Slope Optimizer — adaptive-step local search around a fixed pivot
// =============================================================================
//
// The pivot and side never change; only the slope moves.
//
//   slope_unit = (max(series) - min(series)) / len(series)
//
// The search alternates between two states:
//
//   ProbeDirection  Nudge the slope by +slope_unit * min_step.  If that line
//                   is still a valid bound, derivative = probe - best.
//                   Otherwise nudge by -slope_unit * min_step and take
//                   derivative = best - probe.  Both nudges invalid is fatal.
//
//   TakeStep        Move against the derivative by slope_unit * step.  A
//                   valid, strictly better trial is accepted and sends the
//                   search back to ProbeDirection.  Anything else halves the
//                   step.
//
// The search ends once the step falls below min_step, or at the iteration
// cap for pathological inputs.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::error::{ensure_usable, OptimizationFailure, Result, TrendlineError};
use super::types::{Line, Side, SlopeFit};
use super::validator::{check_trend_line, DEFAULT_TOLERANCE};

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_initial_step() -> f64 {
    1.0
}

fn default_min_step() -> f64 {
    0.0001
}

fn default_max_iterations() -> usize {
    10_000
}

/// Tunables for the validator and the slope search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    /// Allowed violation of the one-sided bound.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Starting step, in units of `slope_unit`.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    /// The search stops once the step drops below this.  Also the size of the
    /// derivative probe.
    #[serde(default = "default_min_step")]
    pub min_step: f64,

    /// Upper bound on loop iterations per optimisation.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl FitParams {
    /// Reject settings the search cannot make progress with.
    ///
    /// Steps must be finite and positive with `initial_step >= min_step`,
    /// the tolerance finite and non-negative, and at least one iteration
    /// allowed.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(TrendlineError::InvalidParams { reason });

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return invalid(format!("tolerance must be finite and >= 0, got {}", self.tolerance));
        }
        if !self.min_step.is_finite() || self.min_step <= 0.0 {
            return invalid(format!("min_step must be finite and > 0, got {}", self.min_step));
        }
        if !self.initial_step.is_finite() || self.initial_step <= 0.0 {
            return invalid(format!(
                "initial_step must be finite and > 0, got {}",
                self.initial_step
            ));
        }
        if self.initial_step < self.min_step {
            return invalid(format!(
                "initial_step {} is below min_step {}",
                self.initial_step, self.min_step
            ));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            initial_step: default_initial_step(),
            min_step: default_min_step(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchState {
    ProbeDirection,
    /// Carries the sign-bearing derivative measured in the last probe.
    TakeStep { derivative: f64 },
}

/// Optimise the slope of the `side` bound through `pivot`, starting from
/// `init_slope`, with default [`FitParams`].
pub fn optimize_slope(side: Side, pivot: usize, init_slope: f64, series: &[f64]) -> Result<SlopeFit> {
    optimize_slope_with(&FitParams::default(), side, pivot, init_slope, series)
}

/// Optimise the slope of the `side` bound through `pivot`.
///
/// # Errors
/// - `InvalidParams` when `params` fails [`FitParams::validate`].
/// - `DegenerateInput` for fewer than two samples, non-finite samples, an
///   out-of-range pivot, or a series with zero range.
/// - `Optimization` when `init_slope` is not a valid bound or when neither
///   derivative probe is valid.
pub fn optimize_slope_with(
    params: &FitParams,
    side: Side,
    pivot: usize,
    init_slope: f64,
    series: &[f64],
) -> Result<SlopeFit> {
    params.validate()?;
    ensure_usable(series, "price")?;
    if pivot >= series.len() {
        return Err(TrendlineError::degenerate(format!(
            "pivot {pivot} is outside a series of {} samples",
            series.len()
        )));
    }

    let max = series.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = series.iter().cloned().fold(f64::INFINITY, f64::min);
    let slope_unit = (max - min) / series.len() as f64;
    if slope_unit <= 0.0 {
        return Err(TrendlineError::degenerate(
            "series has zero price range, no slope scale",
        ));
    }

    let score = |slope: f64| check_trend_line(side, pivot, slope, series, params.tolerance);
    let fail = |reason| TrendlineError::Optimization { side, pivot, reason };

    let mut best_slope = init_slope;
    let mut best_err = score(best_slope).ok_or(fail(OptimizationFailure::InitialSlopeInvalid))?;
    let mut accepted_errors = vec![best_err];

    let probe = slope_unit * params.min_step;
    let mut curr_step = params.initial_step;
    let mut state = SearchState::ProbeDirection;
    let mut iterations = 0usize;

    while curr_step >= params.min_step {
        if iterations >= params.max_iterations {
            warn!(
                %side,
                pivot,
                iterations,
                step = curr_step,
                "slope search hit iteration cap, keeping best line so far"
            );
            return Ok(finish(side, pivot, best_slope, best_err, accepted_errors, iterations, false, series));
        }
        iterations += 1;

        match state {
            SearchState::ProbeDirection => {
                let derivative = match score(best_slope + probe) {
                    Some(up_err) => up_err - best_err,
                    None => match score(best_slope - probe) {
                        Some(down_err) => best_err - down_err,
                        None => return Err(fail(OptimizationFailure::DerivativeFailed)),
                    },
                };
                trace!(%side, pivot, slope = best_slope, derivative, "direction probed");
                state = SearchState::TakeStep { derivative };
            }
            SearchState::TakeStep { derivative } => {
                let test_slope = if derivative > 0.0 {
                    best_slope - slope_unit * curr_step
                } else {
                    best_slope + slope_unit * curr_step
                };

                match score(test_slope) {
                    Some(test_err) if test_err < best_err => {
                        trace!(%side, pivot, slope = test_slope, err = test_err, "step accepted");
                        best_slope = test_slope;
                        best_err = test_err;
                        accepted_errors.push(test_err);
                        state = SearchState::ProbeDirection;
                    }
                    _ => curr_step *= 0.5,
                }
            }
        }
    }

    Ok(finish(side, pivot, best_slope, best_err, accepted_errors, iterations, true, series))
}

#[allow(clippy::too_many_arguments)]
fn finish(
    side: Side,
    pivot: usize,
    slope: f64,
    error: f64,
    accepted_errors: Vec<f64>,
    iterations: usize,
    converged: bool,
    series: &[f64],
) -> SlopeFit {
    let line = Line::through_pivot(slope, pivot, series);
    debug!(
        %side,
        pivot,
        slope = line.slope,
        intercept = line.intercept,
        error,
        iterations,
        converged,
        "slope optimised"
    );
    SlopeFit {
        side,
        pivot,
        line,
        error,
        accepted_errors,
        iterations,
        converged,
    }
}
