// =============================================================================
// Runtime Configuration — JSON settings with atomic save
// =============================================================================
//
// Every tunable of the server and the CLI lives here: where to listen, where
// to fetch bars from, which moving averages to overlay, and the trend-line
// search parameters.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// Credentials are never stored here; they come from the environment.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::DEFAULT_WINDOWS;
use crate::market_data::alpaca::DEFAULT_BASE_URL;
use crate::trendline::FitParams;
use crate::types::FitMode;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "trendscope.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_data_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeframe() -> String {
    "1Day".to_string()
}

fn default_ma_windows() -> Vec<usize> {
    DEFAULT_WINDOWS.to_vec()
}

fn default_max_recent_reports() -> usize {
    50
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level configuration.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    // --- Server --------------------------------------------------------------

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Number of report summaries kept for `GET /api/v1/reports`.
    #[serde(default = "default_max_recent_reports")]
    pub max_recent_reports: usize,

    // --- Market data --------------------------------------------------------

    /// Host of the historical bars API.
    #[serde(default = "default_data_base_url")]
    pub data_base_url: String,

    /// Bar size requested from the provider.
    #[serde(default = "default_timeframe")]
    pub timeframe: String,

    // --- Analysis -----------------------------------------------------------

    /// SMA windows overlaid when moving averages are requested.
    #[serde(default = "default_ma_windows")]
    pub ma_windows: Vec<usize>,

    /// Series the trend lines are fitted to when a request does not say.
    #[serde(default)]
    pub fit_mode: FitMode,

    /// Trend-line search parameters.
    #[serde(default)]
    pub fit_params: FitParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_recent_reports: default_max_recent_reports(),
            data_base_url: default_data_base_url(),
            timeframe: default_timeframe(),
            ma_windows: default_ma_windows(),
            fit_mode: FitMode::default(),
            fit_params: FitParams::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file, malformed JSON or unusable `fit_params` return an
    /// error so the caller can fall back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        config
            .fit_params
            .validate()
            .with_context(|| format!("bad fit_params in {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            fit_mode = %config.fit_mode,
            "config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write (write to
    /// `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }
}
