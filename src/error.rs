//! Error types for the pokedex client

use std::sync::Arc;

/// Unified error type for catalog, collection, session and cache operations.
///
/// Cloneable so a single failed fetch can be handed to every subscriber
/// waiting on the same cache entry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No response received (connection refused, timeout, TLS failure)
    #[error("Network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),
    /// Backend rejected the credentials or the session token (401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),
    /// Client-side input rejected before any request was sent
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Backend failed with a 5xx status
    #[error("Server error {status}: {details}")]
    Server { status: u16, details: String },
    /// Any other non-success HTTP status
    #[error("HTTP error {status}: {details}")]
    HttpStatus { status: u16, details: String },
    /// Failed to parse a JSON body
    #[error("Parse error: {0}")]
    Parse(#[source] Arc<serde_json::Error>),
    /// Session file I/O failed
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),
    /// Cache bookkeeping failed
    #[error("Cache error: {0}")]
    Cache(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(Arc::new(err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(Arc::new(err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(Arc::new(err))
    }
}

/// Result type alias for pokedex operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_status_and_details() {
        let err = ApiError::Server {
            status: 503,
            details: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "Server error 503: maintenance");
    }

    #[test]
    fn io_error_converts_and_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ApiError = io.into();
        assert!(matches!(err, ApiError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn classification_helpers() {
        assert!(ApiError::Unauthorized("expired".into()).is_unauthorized());
        assert!(ApiError::NotFound("pokemon 25".into()).is_not_found());
        assert!(!ApiError::Validation("empty".into()).is_not_found());
    }
}
