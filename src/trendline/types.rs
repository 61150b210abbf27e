// =============================================================================
// Trend-line value types
// =============================================================================

use serde::{Deserialize, Serialize};

/// Which side of the data a trend line bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Lower bound: the line must lie on or below every sample.
    Support,
    /// Upper bound: the line must lie on or above every sample.
    Resistance,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Support => write!(f, "support"),
            Self::Resistance => write!(f, "resistance"),
        }
    }
}

/// A straight line over the sample index: `y = slope * i + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Build the line with the given `slope` that passes exactly through
    /// `(pivot, series[pivot])`.
    ///
    /// Callers guarantee `pivot < series.len()`.
    pub fn through_pivot(slope: f64, pivot: usize, series: &[f64]) -> Self {
        Self {
            slope,
            intercept: -slope * pivot as f64 + series[pivot],
        }
    }

    /// Evaluate the line at sample index `i`.
    #[inline]
    pub fn value_at(&self, i: usize) -> f64 {
        self.slope * i as f64 + self.intercept
    }

    /// Evaluate the line at every index in `0..len`.
    pub fn project(&self, len: usize) -> Vec<f64> {
        (0..len).map(|i| self.value_at(i)).collect()
    }
}

/// Final support and resistance lines for one input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub support: Line,
    pub resistance: Line,
}

/// Least-squares starting point for the optimizer together with the pivots
/// each bound line is anchored through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialFit {
    pub slope: f64,
    pub intercept: f64,
    pub support_pivot: usize,
    pub resistance_pivot: usize,
}

impl InitialFit {
    pub fn line(&self) -> Line {
        Line::new(self.slope, self.intercept)
    }
}

/// Outcome of a single slope optimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeFit {
    pub side: Side,
    pub pivot: usize,
    pub line: Line,
    /// Sum of squared residuals of `line` against the optimised series.
    pub error: f64,
    /// Error of the starting line followed by every accepted improvement.
    pub accepted_errors: Vec<f64>,
    pub iterations: usize,
    /// `false` when the search stopped at the iteration cap instead of the
    /// step size falling below its minimum.
    pub converged: bool,
}
