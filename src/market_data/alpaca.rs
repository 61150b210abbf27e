// =============================================================================
// Alpaca Market Data REST Client — historical daily bars
// =============================================================================
//
// SECURITY: The secret key is never logged or serialized.  Credentials travel
// as the APCA-API-KEY-ID / APCA-API-SECRET-KEY headers on every request.
//
// The bars endpoint pages its results; the client follows `next_page_token`
// until the provider stops returning one.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{Bar, BarProvider};

/// Default market data host.
pub const DEFAULT_BASE_URL: &str = "https://data.alpaca.markets";

/// Largest page the bars endpoint serves.
const PAGE_LIMIT: u32 = 10_000;

/// Safety cap on followed page tokens per request.
const MAX_PAGES: usize = 100;

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BarsPage {
    #[serde(default)]
    bars: Option<Vec<RawBar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    #[serde(default)]
    n: Option<u64>,
    #[serde(default)]
    vw: Option<f64>,
}

impl From<RawBar> for Bar {
    fn from(raw: RawBar) -> Self {
        Self {
            timestamp: raw.t,
            open: raw.o,
            high: raw.h,
            low: raw.l,
            close: raw.c,
            volume: raw.v,
            trade_count: raw.n,
            vwap: raw.vw,
        }
    }
}

/// Parse one page of the bars response into bars and the next page token.
fn parse_bars_page(body: serde_json::Value) -> Result<(Vec<Bar>, Option<String>)> {
    let page: BarsPage =
        serde_json::from_value(body).context("bars response has an unexpected shape")?;
    let bars = page
        .bars
        .unwrap_or_default()
        .into_iter()
        .map(Bar::from)
        .collect();
    let token = page.next_page_token.filter(|t| !t.is_empty());
    Ok((bars, token))
}

fn day_start_rfc3339(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Historical stock bars client.
#[derive(Clone)]
pub struct AlpacaClient {
    base_url: String,
    timeframe: String,
    client: reqwest::Client,
}

impl AlpacaClient {
    /// Create a new `AlpacaClient`.
    ///
    /// # Arguments
    /// * `api_key`   — key id, sent as `APCA-API-KEY-ID`.
    /// * `secret`    — secret key, sent as `APCA-API-SECRET-KEY`.
    /// * `base_url`  — data host, normally [`DEFAULT_BASE_URL`].
    /// * `timeframe` — bar size, e.g. `1Day`.
    pub fn new(
        api_key: &str,
        secret: &str,
        base_url: impl Into<String>,
        timeframe: impl Into<String>,
    ) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(api_key).context("API key is not a valid header value")?,
        );
        let mut secret_val =
            HeaderValue::from_str(secret).context("API secret is not a valid header value")?;
        secret_val.set_sensitive(true);
        default_headers.insert("APCA-API-SECRET-KEY", secret_val);

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "AlpacaClient initialised");

        Ok(Self {
            base_url,
            timeframe: timeframe.into(),
            client,
        })
    }

    /// GET /v2/stocks/{ticker}/bars for `[start, end]`, following pagination.
    #[instrument(skip(self), name = "alpaca::get_bars")]
    pub async fn get_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>> {
        let url = format!("{}/v2/stocks/{}/bars", self.base_url, ticker);
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query: Vec<(&str, String)> = vec![
                ("timeframe", self.timeframe.clone()),
                ("start", day_start_rfc3339(start)),
                ("end", day_start_rfc3339(end)),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("page_token", token));
            }

            let resp = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .with_context(|| format!("GET /v2/stocks/{ticker}/bars request failed"))?;

            let status = resp.status();
            let body: serde_json::Value = resp
                .json()
                .await
                .context("failed to parse bars response")?;

            if !status.is_success() {
                anyhow::bail!(
                    "Alpaca GET /v2/stocks/{}/bars returned {}: {}",
                    ticker,
                    status,
                    body
                );
            }

            let (page, next) = parse_bars_page(body)?;
            bars.extend(page);

            match next {
                Some(token) => page_token = Some(token),
                None => {
                    debug!(ticker, count = bars.len(), "bars fetched");
                    return Ok(bars);
                }
            }
        }

        warn!(ticker, pages = MAX_PAGES, count = bars.len(), "bars pagination cap reached");
        Ok(bars)
    }
}

#[async_trait]
impl BarProvider for AlpacaClient {
    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>> {
        self.get_bars(ticker, start, end).await
    }
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("credentials", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeframe", &self.timeframe)
            .finish()
    }
}
