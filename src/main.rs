// =============================================================================
// trendscope — Main Entry Point
// =============================================================================
//
// Subcommands:
//   serve        HTTP API (analysis form endpoint, raw trend-line fitting)
//   analyze      one-off analysis of a ticker over a date range
//   fit          trend lines for local data (comma-separated values or a
//                JSON bar file)
//   init-config  write the default configuration file
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trendscope::analysis::{run_analysis, AnalysisRequest};
use trendscope::api;
use trendscope::app_state::AppState;
use trendscope::market_data::{load_bars_json, AlpacaClient, PriceColumns};
use trendscope::runtime_config::{AppConfig, DEFAULT_CONFIG_PATH};
use trendscope::trendline::TrendlineFitter;
use trendscope::types::FitMode;

#[derive(Parser)]
#[command(name = "trendscope")]
#[command(about = "Support and resistance trend lines for daily price bars", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        bind: Option<String>,
    },

    /// Fetch bars for a ticker and fit trend lines
    Analyze {
        /// Ticker symbol, e.g. AMZN
        #[arg(short, long)]
        ticker: String,

        /// First day (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(short, long)]
        end: NaiveDate,

        /// Overlay simple moving averages
        #[arg(long)]
        ma: bool,

        /// Include volume bars
        #[arg(long)]
        volume: bool,

        /// Fit support to lows and resistance to highs
        #[arg(long)]
        high_low: bool,

        /// Write the full report (chart payload included) to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit trend lines to local data
    Fit {
        /// Comma-separated prices, oldest first
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with = "input")]
        values: Vec<f64>,

        /// JSON file holding an array of bars
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Fit support to lows and resistance to highs (needs --input)
        #[arg(long, requires = "input")]
        high_low: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::InitConfig { force } = &cli.command {
        return init_config(&cli.config, *force);
    }

    let mut config = AppConfig::load(&cli.config).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Ok(addr) = std::env::var("TRENDSCOPE_BIND_ADDR") {
        config.bind_addr = addr;
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            serve(config).await
        }
        Commands::Analyze {
            ticker,
            start,
            end,
            ma,
            volume,
            high_low,
            output,
        } => {
            let request = AnalysisRequest {
                ticker,
                start_date: start,
                end_date: end,
                include_ma: ma,
                include_volume: volume,
                mode: high_low.then_some(FitMode::HighLow),
            };
            analyze(&config, &request, output).await
        }
        Commands::Fit {
            values,
            input,
            high_low,
        } => fit(&config, values, input, high_low),
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn market_data_client(config: &AppConfig) -> Result<AlpacaClient> {
    let api_key = std::env::var("APCA_API_KEY_ID").unwrap_or_default();
    let api_secret = std::env::var("APCA_API_SECRET_KEY").unwrap_or_default();
    if api_key.is_empty() || api_secret.is_empty() {
        warn!("APCA_API_KEY_ID / APCA_API_SECRET_KEY not set, data requests will be rejected");
    }
    AlpacaClient::new(&api_key, &api_secret, config.data_base_url.clone(), config.timeframe.clone())
}

async fn serve(config: AppConfig) -> Result<()> {
    let bind_addr = config.bind_addr.clone();
    let provider = Arc::new(market_data_client(&config)?);
    let state = Arc::new(AppState::new(config, provider));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("trendscope shut down complete.");
    Ok(())
}

async fn analyze(config: &AppConfig, request: &AnalysisRequest, output: Option<PathBuf>) -> Result<()> {
    let client = market_data_client(config)?;
    let report = run_analysis(&client, request, config).await?;

    println!("{} — {} bars, fitted on {}", report.ticker, report.bar_count, report.mode);
    match &report.trend_lines {
        Some(t) => {
            println!(
                "  support:    slope {:+.6}  intercept {:.4}  (pivot {})",
                t.support.slope,
                t.support.intercept,
                t.support_pivot_time.format("%Y-%m-%d")
            );
            println!(
                "  resistance: slope {:+.6}  intercept {:.4}  (pivot {})",
                t.resistance.slope,
                t.resistance.intercept,
                t.resistance_pivot_time.format("%Y-%m-%d")
            );
        }
        None => println!("  trend lines: unavailable"),
    }
    for notice in &report.notices {
        println!("  note: {notice}");
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report).context("failed to serialise report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn fit(config: &AppConfig, values: Vec<f64>, input: Option<PathBuf>, high_low: bool) -> Result<()> {
    let fitter = TrendlineFitter::new(config.fit_params.clone());

    let result = match input {
        Some(path) => {
            let bars = load_bars_json(&path)?;
            let cols = PriceColumns::from_bars(&bars);
            if high_low {
                fitter.fit_high_low(&cols.high, &cols.low, &cols.close)
            } else {
                fitter.fit_series(&cols.close)
            }
        }
        None => fitter.fit_series(&values),
    }
    .context("trend line fit not available")?;

    let json = serde_json::to_string_pretty(&result.lines()).context("failed to serialise lines")?;
    println!("{json}");
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save(path)
}
