// =============================================================================
// Shared types used across the trendscope application
// =============================================================================

use serde::{Deserialize, Serialize};

/// Which price series the trend lines are fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Both bounds fitted to closing prices.
    Close,
    /// Support fitted to lows, resistance to highs, starting trend from closes.
    HighLow,
}

impl Default for FitMode {
    fn default() -> Self {
        Self::Close
    }
}

impl std::fmt::Display for FitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Close => write!(f, "close"),
            Self::HighLow => write!(f, "high_low"),
        }
    }
}
