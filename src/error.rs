use thiserror::Error;

/// Errors raised while loading, parsing or exporting data, plus the
/// single-woreda lookup. `analyze` itself never fails.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid period '{0}': expected yearly, 1, 2, 3 or 4")]
    InvalidPeriod(String),
    #[error("Invalid date '{0}'")]
    InvalidDate(String),
    #[error("Invalid fiscal year '{0}'")]
    InvalidFiscalYear(String),
    #[error("Missing required field {0}")]
    MissingField(&'static str),
    #[error("Invalid plan quantity '{0}'")]
    InvalidQuantity(String),
    #[error("Duplicate plan entry for woreda {woreda}, service {service}")]
    DuplicatePlan { woreda: String, service: String },
    #[error("No plan found for woreda {woreda} in fiscal year {fiscal_year}")]
    WoredaNotFound { woreda: String, fiscal_year: i32 },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
