//! Shared error types across rrdserve crates.
//!
//! Two layers: `RrdServeError` fails a whole request (or startup), while
//! `FetchError` is scoped to a single target and never escapes the query
//! orchestrator.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Malformed or out-of-range input.
    InvalidRequest,
    /// Archive root cannot be enumerated.
    CatalogUnavailable,
    /// Overall request deadline exceeded.
    RequestTimeout,
    /// Configuration rejected at startup.
    Config,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::InvalidRequest => "INVALID_REQUEST",
            ClientCode::CatalogUnavailable => "CATALOG_UNAVAILABLE",
            ClientCode::RequestTimeout => "REQUEST_TIMEOUT",
            ClientCode::Config => "CONFIG",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RrdServeError>;

/// Request-level (and startup) error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RrdServeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("request timed out")]
    RequestTimeout,
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RrdServeError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RrdServeError::InvalidRequest(_) => ClientCode::InvalidRequest,
            RrdServeError::CatalogUnavailable(_) => ClientCode::CatalogUnavailable,
            RrdServeError::RequestTimeout => ClientCode::RequestTimeout,
            RrdServeError::Config(_) => ClientCode::Config,
            RrdServeError::Internal(_) => ClientCode::Internal,
        }
    }
}

/// Failure fetching one target. Degrades that target to an empty series.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("metric not found: {0}")]
    MetricNotFound(String),
    #[error("store corrupt: {0}")]
    StoreCorrupt(String),
    #[error("fetch timed out")]
    Timeout,
    #[error("fetch failed: {0}")]
    Internal(String),
}

impl FetchError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::MetricNotFound(_) => "metric_not_found",
            FetchError::StoreCorrupt(_) => "store_corrupt",
            FetchError::Timeout => "timeout",
            FetchError::Internal(_) => "internal",
        }
    }
}
