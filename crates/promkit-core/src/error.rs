//! Shared error type across promkit crates.

use thiserror::Error;

/// Stable error codes, safe to log or expose to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Metric kind outside the supported set.
    UnsupportedMetricKind,
    /// Malformed options or metric configuration.
    InvalidConfiguration,
    /// A metric with the same name already lives in the target registry.
    DuplicateMetric,
    /// Any other failure reported by the metrics client.
    Client,
    /// Unsupported config document version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnsupportedMetricKind => "UNSUPPORTED_METRIC_KIND",
            ErrorCode::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::Client => "CLIENT",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PromError>;

/// Unified error type. Every variant is a startup-time failure; request
/// handling never produces one.
#[derive(Debug, Error)]
pub enum PromError {
    #[error("the type {0} is not supported")]
    UnsupportedMetricKind(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("duplicate metric: {0}")]
    DuplicateMetric(String),
    #[error("metrics client: {0}")]
    Client(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl PromError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PromError::UnsupportedMetricKind(_) => ErrorCode::UnsupportedMetricKind,
            PromError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            PromError::DuplicateMetric(_) => ErrorCode::DuplicateMetric,
            PromError::Client(_) => ErrorCode::Client,
            PromError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            PromError::Internal(_) => ErrorCode::Internal,
        }
    }
}
