// =============================================================================
// Trend-Line Fitting Engine
// =============================================================================
//
// Pure, synchronous fitting of support (lower bound) and resistance (upper
// bound) lines to a price series indexed by position:
// - validator: one-sided bound check and squared-residual score
// - optimizer: adaptive-step slope search around a fixed pivot
// - initial_fit: least-squares starting slope and pivot selection
// - fitter: single-series and high/low/close entry points

pub mod error;
pub mod fitter;
pub mod initial_fit;
pub mod optimizer;
pub mod types;
pub mod validator;

pub use error::{OptimizationFailure, TrendlineError};
pub use fitter::{fit_trendlines, fit_trendlines_high_low, TrendlineFit, TrendlineFitter};
pub use initial_fit::{estimate_initial_fit, estimate_initial_fit_high_low};
pub use optimizer::{optimize_slope, optimize_slope_with, FitParams};
pub use types::{FitResult, InitialFit, Line, Side, SlopeFit};
pub use validator::{check_trend_line, validate_line, DEFAULT_TOLERANCE};
