//! Error type for the trend-line engine.

use thiserror::Error;

use super::types::Side;

/// Why the optimiser gave up on a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationFailure {
    /// The starting slope does not describe a valid bound at its pivot.
    InitialSlopeInvalid,
    /// Neither a small slope increase nor decrease is a valid bound, so no
    /// descent direction exists.
    DerivativeFailed,
}

impl std::fmt::Display for OptimizationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitialSlopeInvalid => write!(f, "initial slope is not a valid bound"),
            Self::DerivativeFailed => write!(f, "derivative probes are both invalid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrendlineError {
    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("invalid fit parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("{side} optimisation failed at pivot {pivot}: {reason}")]
    Optimization {
        side: Side,
        pivot: usize,
        reason: OptimizationFailure,
    },
}

impl TrendlineError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrendlineError>;

/// Reject series the optimiser cannot work with: fewer than two samples or
/// any non-finite sample.
pub(crate) fn ensure_usable(series: &[f64], name: &str) -> Result<()> {
    if series.len() < 2 {
        return Err(TrendlineError::degenerate(format!(
            "{name} series needs at least 2 samples, got {}",
            series.len()
        )));
    }
    if let Some(i) = series.iter().position(|v| !v.is_finite()) {
        return Err(TrendlineError::degenerate(format!(
            "{name} series has a non-finite sample at index {i}"
        )));
    }
    Ok(())
}
