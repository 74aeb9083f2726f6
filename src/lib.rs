//! Plan-vs-report achievement analytics for woreda civil-registration
//! offices, measured over Ethiopian fiscal quarters.

pub mod analyzer;
pub mod calendar;
pub mod catalog;
pub mod error;
pub mod loader;
pub mod output;
pub mod quarter;
pub mod types;
pub mod util;

pub use analyzer::{analyze, analyze_woreda, daily_summary, AnalysisRequest};
pub use calendar::{
    current_ethiopian_year, quarter_date_range, to_ethiopian, DateRange, EthiopianDate, Period,
};
pub use catalog::{CategorySet, ServiceCatalog};
pub use error::{AnalyticsError, Result};
pub use quarter::{cumulative_quarterly_targets, CumulativeTargets};
pub use types::{
    AnalysisReport, DailySummary, Plan, PlanBook, PlanEntry, Report, WoredaDetail, WoredaKey,
};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber once. `RUST_LOG` overrides the
/// default level.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let level = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("registry_analytics={}", level)));

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
