//! Gateway error types.
//!
//! All gateway operations return [`Result<T>`] with [`GatewayError`].
//! Every variant except [`GatewayError::CircuitOpen`] and
//! [`GatewayError::Cancelled`] counts as a failure for the circuit
//! breaker.

use thiserror::Error;

/// Errors that can occur when calling the AI completion service.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// The HTTP request failed (non-2xx status or transport error).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Authentication was rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested model does not exist on the provider (HTTP 404).
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The backend has not been configured (e.g. missing API key).
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    /// The provider returned a body that could not be used: unparseable
    /// JSON, an explicit `error` object, or no choices.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The per-call timeout elapsed.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The circuit breaker is open; no HTTP request was made.
    #[error("circuit open: calls refused until cooldown elapses")]
    CircuitOpen,

    /// The caller cancelled while waiting or in flight.
    #[error("cancelled")]
    Cancelled,

    /// An HTTP-level error from reqwest.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether this error should be recorded as a breaker failure.
    ///
    /// Refused calls (breaker already open) and caller cancellations are
    /// not evidence about the provider's health.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, GatewayError::CircuitOpen | GatewayError::Cancelled)
    }
}

/// A convenience alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_request_failed() {
        let err = GatewayError::RequestFailed("HTTP 500: boom".into());
        assert_eq!(err.to_string(), "request failed: HTTP 500: boom");
    }

    #[test]
    fn display_circuit_open() {
        assert!(GatewayError::CircuitOpen.to_string().contains("circuit open"));
    }

    #[test]
    fn breaker_accounting() {
        assert!(GatewayError::RequestFailed("x".into()).counts_as_failure());
        assert!(GatewayError::Timeout(std::time::Duration::from_secs(60)).counts_as_failure());
        assert!(GatewayError::InvalidResponse("no choices".into()).counts_as_failure());
        assert!(!GatewayError::CircuitOpen.counts_as_failure());
        assert!(!GatewayError::Cancelled.counts_as_failure());
    }

    #[test]
    fn json_error_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err: GatewayError = serde_err.into();
        assert!(err.to_string().starts_with("json error:"));
    }
}
