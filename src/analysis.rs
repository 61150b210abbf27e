// =============================================================================
// Analysis Pipeline — bars in, chart payload and trend lines out
// =============================================================================
//
//   1. Validate the request (ticker, date range).
//   2. Fetch daily bars from the provider.
//   3. Optionally compute SMA overlays over closes.
//   4. Fit support/resistance lines (closes, or highs/lows).
//   5. Assemble the chart payload.
//
// A failed trend-line fit never fails the request: the report carries a
// notice and the chart is returned without the two bound overlays.
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::chart::ChartPayload;
use crate::indicators::moving_averages;
use crate::market_data::{Bar, BarProvider, PriceColumns};
use crate::runtime_config::AppConfig;
use crate::trendline::{Line, TrendlineFit, TrendlineFitter};
use crate::types::FitMode;

/// Parameters of one analysis, as submitted by the form or the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub include_ma: bool,
    #[serde(default)]
    pub include_volume: bool,
    /// Falls back to the configured mode when absent.
    #[serde(default)]
    pub mode: Option<FitMode>,
}

impl AnalysisRequest {
    /// Upper-cased, trimmed ticker.
    pub fn normalised_ticker(&self) -> String {
        self.ticker.trim().to_uppercase()
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        let ticker = self.normalised_ticker();
        if ticker.is_empty() {
            return Err(AnalysisError::InvalidRequest("ticker is empty".to_string()));
        }
        if !ticker.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
            return Err(AnalysisError::InvalidRequest(format!(
                "ticker '{ticker}' has unsupported characters"
            )));
        }
        if self.start_date >= self.end_date {
            return Err(AnalysisError::InvalidRequest(format!(
                "start date {} is not before end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no bars returned for {ticker}")]
    NoData { ticker: String },

    #[error("market data fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),
}

/// Trend lines with the detail a reader of the chart may want.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub support: Line,
    pub resistance: Line,
    pub support_pivot: usize,
    pub resistance_pivot: usize,
    pub support_pivot_time: DateTime<Utc>,
    pub resistance_pivot_time: DateTime<Utc>,
    pub support_error: f64,
    pub resistance_error: f64,
    pub initial_slope: f64,
    pub converged: bool,
}

impl TrendSummary {
    fn from_fit(fit: &TrendlineFit, bars: &[Bar]) -> Self {
        Self {
            support: fit.support.line,
            resistance: fit.resistance.line,
            support_pivot: fit.support.pivot,
            resistance_pivot: fit.resistance.pivot,
            support_pivot_time: bars[fit.support.pivot].timestamp,
            resistance_pivot_time: bars[fit.resistance.pivot].timestamp,
            support_error: fit.support.error,
            resistance_error: fit.resistance.error,
            initial_slope: fit.initial.slope,
            converged: fit.support.converged && fit.resistance.converged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Unique identifier for this report (UUID v4).
    pub id: String,
    pub ticker: String,
    pub mode: FitMode,
    /// ISO 8601 timestamp of when this report was created.
    pub created_at: String,
    pub bar_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_lines: Option<TrendSummary>,
    /// Degradations the caller should surface, e.g. an unavailable fit.
    pub notices: Vec<String>,
    pub chart: ChartPayload,
}

/// Compact record kept in the server's recent-report list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub id: String,
    pub ticker: String,
    pub mode: FitMode,
    pub created_at: String,
    pub bar_count: usize,
    pub trend_fit_available: bool,
}

impl AnalysisReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.id.clone(),
            ticker: self.ticker.clone(),
            mode: self.mode,
            created_at: self.created_at.clone(),
            bar_count: self.bar_count,
            trend_fit_available: self.trend_lines.is_some(),
        }
    }
}

/// Build a report from bars already in hand.  Pure apart from logging.
pub fn build_report(
    ticker: &str,
    bars: &[Bar],
    include_ma: bool,
    include_volume: bool,
    mode: FitMode,
    config: &AppConfig,
) -> AnalysisReport {
    let cols = PriceColumns::from_bars(bars);
    let mut chart = ChartPayload::new(ticker, bars);
    let mut notices = Vec::new();

    if include_volume {
        chart = chart.with_volume(bars);
    }
    if include_ma {
        chart = chart.with_moving_averages(&moving_averages(&cols.close, &config.ma_windows));
    }

    let fitter = TrendlineFitter::new(config.fit_params.clone());
    let fitted = match mode {
        FitMode::Close => fitter.fit_series(&cols.close),
        FitMode::HighLow => fitter.fit_high_low(&cols.high, &cols.low, &cols.close),
    };

    let trend_lines = match fitted {
        Ok(fit) => {
            chart = chart.with_trend_lines(&fit.lines());
            let summary = TrendSummary::from_fit(&fit, bars);
            if !summary.converged {
                notices.push("trend line search stopped at its iteration limit".to_string());
            }
            Some(summary)
        }
        Err(e) => {
            warn!(ticker, %mode, error = %e, "trend line fit not available");
            notices.push(format!("trend line fit not available: {e}"));
            None
        }
    };

    AnalysisReport {
        id: uuid::Uuid::new_v4().to_string(),
        ticker: ticker.to_string(),
        mode,
        created_at: Utc::now().to_rfc3339(),
        bar_count: bars.len(),
        trend_lines,
        notices,
        chart,
    }
}

/// Validate `request`, fetch its bars from `provider` and build the report.
pub async fn run_analysis(
    provider: &dyn BarProvider,
    request: &AnalysisRequest,
    config: &AppConfig,
) -> Result<AnalysisReport, AnalysisError> {
    request.validate()?;
    let ticker = request.normalised_ticker();
    let mode = request.mode.unwrap_or(config.fit_mode);

    let bars = provider
        .fetch(&ticker, request.start_date, request.end_date)
        .await
        .map_err(AnalysisError::Fetch)?;
    if bars.is_empty() {
        return Err(AnalysisError::NoData { ticker });
    }

    let report = build_report(
        &ticker,
        &bars,
        request.include_ma,
        request.include_volume,
        mode,
        config,
    );

    info!(
        id = %report.id,
        ticker = %report.ticker,
        bars = report.bar_count,
        mode = %mode,
        trend_fit = report.trend_lines.is_some(),
        "analysis complete"
    );
    Ok(report)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn synthetic_bars(n: usize) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2023, 1, 3, 5, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let x = i as f64;
                let close = 90.0 + 0.25 * x + (x / 5.0).sin() * 4.0;
                let high = close + 1.0 + (x * 1.3).cos().abs();
                let low = close - 1.0 - (x * 0.9).sin().abs();
                Bar::new(t0 + Duration::days(i as i64), close - 0.3, high, low, close, 1e6 + 1e3 * x)
            })
            .collect()
    }

    struct FixedProvider(Vec<Bar>);

    #[async_trait]
    impl BarProvider for FixedProvider {
        async fn fetch(&self, _ticker: &str, _start: NaiveDate, _end: NaiveDate) -> Result<Vec<Bar>> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl BarProvider for FailingProvider {
        async fn fetch(&self, _ticker: &str, _start: NaiveDate, _end: NaiveDate) -> Result<Vec<Bar>> {
            anyhow::bail!("upstream unavailable")
        }
    }

    fn request(ticker: &str) -> AnalysisRequest {
        AnalysisRequest {
            ticker: ticker.to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 11, 16).unwrap(),
            include_ma: true,
            include_volume: true,
            mode: None,
        }
    }

    #[test]
    fn report_carries_all_overlays_when_fit_succeeds() {
        let bars = synthetic_bars(160);
        let report = build_report("AMZN", &bars, true, true, FitMode::Close, &AppConfig::default());

        assert_eq!(report.bar_count, 160);
        assert!(report.notices.is_empty(), "{:?}", report.notices);
        let trend = report.trend_lines.as_ref().unwrap();
        assert!(trend.converged);
        assert_eq!(trend.support_pivot_time, bars[trend.support_pivot].timestamp);

        let names: Vec<&str> = report.chart.overlays.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["SMA 20", "SMA 50", "SMA 100", "Support", "Resistance"]);
        assert!(report.chart.volume.is_some());
    }

    #[test]
    fn report_degrades_when_fit_is_unavailable() {
        // A single bar cannot be fitted; the chart still renders.
        let bars = synthetic_bars(1);
        let report = build_report("AMZN", &bars, false, false, FitMode::Close, &AppConfig::default());

        assert!(report.trend_lines.is_none());
        assert_eq!(report.chart.candles.len(), 1);
        assert!(report.chart.overlays.is_empty());
        assert_eq!(report.notices.len(), 1);
        assert!(report.notices[0].starts_with("trend line fit not available"));
        assert!(!report.summary().trend_fit_available);
    }

    #[test]
    fn report_flags_search_stopped_at_iteration_limit() {
        let bars = synthetic_bars(120);
        let mut config = AppConfig::default();
        config.fit_params.max_iterations = 1;

        let report = build_report("AMZN", &bars, false, false, FitMode::Close, &config);
        let trend = report.trend_lines.as_ref().unwrap();
        assert!(!trend.converged);
        assert_eq!(
            report.notices,
            vec!["trend line search stopped at its iteration limit".to_string()]
        );
        assert_eq!(report.chart.overlays.len(), 2);
        assert!(report.summary().trend_fit_available);
    }

    #[test]
    fn high_low_mode_bounds_highs_and_lows() {
        let bars = synthetic_bars(90);
        let report = build_report("MSFT", &bars, false, false, FitMode::HighLow, &AppConfig::default());
        let trend = report.trend_lines.unwrap();
        for (i, b) in bars.iter().enumerate() {
            assert!(trend.support.value_at(i) <= b.low + 1e-5);
            assert!(trend.resistance.value_at(i) >= b.high - 1e-5);
        }
    }

    #[tokio::test]
    async fn run_analysis_uses_configured_mode_and_normalises_ticker() {
        let provider = FixedProvider(synthetic_bars(60));
        let mut config = AppConfig::default();
        config.fit_mode = FitMode::HighLow;

        let report = run_analysis(&provider, &request(" amzn "), &config).await.unwrap();
        assert_eq!(report.ticker, "AMZN");
        assert_eq!(report.mode, FitMode::HighLow);
        assert_eq!(report.chart.title, "Stock Data for AMZN");
    }

    #[tokio::test]
    async fn run_analysis_rejects_bad_requests() {
        let provider = FixedProvider(synthetic_bars(10));
        let config = AppConfig::default();

        let err = run_analysis(&provider, &request("  "), &config).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));

        let mut reversed = request("AMZN");
        std::mem::swap(&mut reversed.start_date, &mut reversed.end_date);
        let err = run_analysis(&provider, &reversed, &config).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));

        let err = run_analysis(&provider, &request("AM/ZN"), &config).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn run_analysis_reports_fetch_failures_and_empty_data() {
        let config = AppConfig::default();

        let err = run_analysis(&FailingProvider, &request("AMZN"), &config).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Fetch(_)));
        assert!(err.to_string().contains("upstream unavailable"));

        let err = run_analysis(&FixedProvider(Vec::new()), &request("AMZN"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoData { .. }));
    }

    #[test]
    fn request_deserialises_from_form_json() {
        let json = r#"{ "ticker": "aapl", "start_date": "2023-01-01", "end_date": "2023-06-30", "include_ma": true }"#;
        let req: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.normalised_ticker(), "AAPL");
        assert!(req.include_ma);
        assert!(!req.include_volume);
        assert_eq!(req.mode, None);
    }
}
