// =============================================================================
// Market Data — historical bars and the providers that supply them
// =============================================================================

pub mod alpaca;
pub mod bar;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use alpaca::AlpacaClient;
pub use bar::{load_bars_json, Bar, PriceColumns};

/// Source of historical daily bars for a ticker, oldest first.
#[async_trait]
pub trait BarProvider: Send + Sync {
    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>>;
}
