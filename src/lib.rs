// =============================================================================
// trendscope — support/resistance trend-line fitting for daily price bars
// =============================================================================
//
// `trendline` is the pure fitting engine.  Everything else is the shell that
// feeds it bars and hands its lines to a chart: market data, indicators, the
// analysis pipeline, configuration and the HTTP API.
// =============================================================================

pub mod analysis;
pub mod api;
pub mod app_state;
pub mod chart;
pub mod indicators;
pub mod market_data;
pub mod runtime_config;
pub mod trendline;
pub mod types;
