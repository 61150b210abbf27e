// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`:
//
//   GET  /health      liveness, state version, server time
//   POST /analyze     ticker + date range -> chart payload and trend lines
//   POST /trendlines  raw series (or high/low/close) -> support/resistance
//   GET  /reports     recent analysis summaries
//   GET  /config      active configuration
//
// CORS is configured permissively so a browser front end on another origin
// can post the analysis form.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::{run_analysis, AnalysisError, AnalysisRequest};
use crate::app_state::AppState;
use crate::trendline::{TrendlineError, TrendlineFitter};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/trendlines", post(trendlines))
        .route("/api/v1/reports", get(reports))
        .route("/api/v1/config", get(config))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// JSON error body with a status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("invalid request body: {}", e.body_text()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        let status = match &e {
            AnalysisError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AnalysisError::NoData { .. } => StatusCode::NOT_FOUND,
            AnalysisError::Fetch(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<TrendlineError> for ApiError {
    fn from(e: TrendlineError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: e.to_string(),
        }
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Analyze
// =============================================================================

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let report = match run_analysis(state.provider.as_ref(), &request, &state.config).await {
        Ok(report) => report,
        Err(e) => {
            warn!(ticker = %request.ticker, error = %e, "analysis request failed");
            return Err(e.into());
        }
    };

    state.push_report(&report);
    info!(id = %report.id, ticker = %report.ticker, "analysis served");
    Ok(Json(report).into_response())
}

// =============================================================================
// Trend lines on raw data
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum TrendlineInput {
    HighLow {
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    },
    Series {
        series: Vec<f64>,
    },
}

async fn trendlines(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TrendlineInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let fitter = TrendlineFitter::new(state.config.fit_params.clone());
    let fit = match &input {
        TrendlineInput::Series { series } => fitter.fit_series(series),
        TrendlineInput::HighLow { high, low, close } => fitter.fit_high_low(high, low, close),
    }?;
    Ok(Json(fit.lines()).into_response())
}

// =============================================================================
// Reports & config
// =============================================================================

async fn reports(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reports = state.recent_reports.read().clone();
    Json(reports)
}

async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}
