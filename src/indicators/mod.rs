// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free overlay indicators computed over closing prices.

pub mod sma;

pub use sma::{calculate_sma, moving_averages, MovingAverage, DEFAULT_WINDOWS};
