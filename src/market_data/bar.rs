use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            trade_count: None,
            vwap: None,
        }
    }
}

/// Column-oriented view of a bar slice, the shape the fitting engine and the
/// indicators consume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceColumns {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl PriceColumns {
    pub fn from_bars(bars: &[Bar]) -> Self {
        let mut cols = Self {
            open: Vec::with_capacity(bars.len()),
            high: Vec::with_capacity(bars.len()),
            low: Vec::with_capacity(bars.len()),
            close: Vec::with_capacity(bars.len()),
            volume: Vec::with_capacity(bars.len()),
        };
        for b in bars {
            cols.open.push(b.open);
            cols.high.push(b.high);
            cols.low.push(b.low);
            cols.close.push(b.close);
            cols.volume.push(b.volume);
        }
        cols
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

/// Read a JSON array of [`Bar`]s from `path`, sorted oldest first.
pub fn load_bars_json(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bars from {}", path.display()))?;
    let mut bars: Vec<Bar> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse bars from {}", path.display()))?;
    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}
