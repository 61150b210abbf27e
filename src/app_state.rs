// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by every HTTP handler through `Arc<AppState>`.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - The config is fixed at startup and read without locking.
//   - parking_lot::RwLock for the recent-report list.
//   - The bar provider is an `Arc<dyn BarProvider>` and manages its own
//     connection pool.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::analysis::{AnalysisReport, ReportSummary};
use crate::market_data::BarProvider;
use crate::runtime_config::AppConfig;

pub struct AppState {
    /// Incremented on every stored report.
    pub state_version: AtomicU64,

    pub config: AppConfig,

    pub provider: Arc<dyn BarProvider>,

    /// Newest last, bounded by `config.max_recent_reports`.
    pub recent_reports: RwLock<Vec<ReportSummary>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn BarProvider>) -> Self {
        Self {
            state_version: AtomicU64::new(0),
            config,
            provider,
            recent_reports: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::Relaxed)
    }

    /// Record a finished report, trimming the oldest beyond the configured
    /// limit.
    pub fn push_report(&self, report: &AnalysisReport) {
        let limit = self.config.max_recent_reports;
        let mut reports = self.recent_reports.write();
        reports.push(report.summary());
        if reports.len() > limit {
            let excess = reports.len() - limit;
            reports.drain(..excess);
        }
        self.state_version.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
