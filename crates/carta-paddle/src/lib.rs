#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

use std::time::Duration;

/// Logging target for client lifecycle and health checks.
pub const TRACING_TARGET_CLIENT: &str = "carta_paddle::client";

/// Logging target for recognition requests.
pub const TRACING_TARGET_OCR: &str = "carta_paddle::ocr";

pub mod client;

pub use client::{OcrLines, PdClient, PdConfig};

/// Result type for all Paddle operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure modes when talking to a Paddle serving endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client errors (connection, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status or a non-zero `errorCode`.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the service
        message: String,
        /// `errorCode` reported in the body, if any
        code: Option<i64>,
    },

    /// The body could not be interpreted.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of what's invalid
        message: String,
        /// Raw response body, truncated
        body: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// The service reported a request or gateway timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout {
        /// Configured request timeout
        timeout: Duration,
    },

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        /// Details about the rate limit violation
        message: String,
    },

    /// The service is temporarily unable to answer.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Description of the unavailability
        message: String,
    },
}

impl Error {
    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>, code: Option<i64>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            code,
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>, body: Option<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            body,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Check if this error indicates a temporary failure that might succeed on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::RateLimit { .. } | Error::ServiceUnavailable { .. } => {
                true
            }

            Error::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),

            // Application errors carried in a 200 body are not retryable.
            Error::Api { status, code, .. } => {
                code.is_none() && matches!(*status, 408 | 429 | 500..=599)
            }

            Error::Config { .. } | Error::InvalidResponse { .. } => false,
        }
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Http(_) => "http",
            Error::Api { .. } => "api",
            Error::InvalidResponse { .. } => "invalid_response",
            Error::Config { .. } => "config",
            Error::Timeout { .. } => "timeout",
            Error::RateLimit { .. } => "rate_limit",
            Error::ServiceUnavailable { .. } => "service_unavailable",
        }
    }
}

impl From<Error> for carta_core::Error {
    fn from(error: Error) -> Self {
        let message = format!("paddle {}: {error}", error.category());
        let mapped = match &error {
            Error::Config { .. } => carta_core::Error::worker_unavailable(message),
            _ if error.is_retryable() => carta_core::Error::transient(message),
            _ => carta_core::Error::inference_failure(message),
        };
        mapped.with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use carta_core::ErrorCode;

    use super::*;

    #[test]
    fn status_errors_are_classified() {
        assert!(Error::api(503, "busy", None).is_retryable());
        assert!(Error::api(429, "slow down", None).is_retryable());
        assert!(Error::api(408, "late", None).is_retryable());
        assert!(!Error::api(400, "bad image", None).is_retryable());
        assert!(!Error::api(200, "decode failed", Some(1001)).is_retryable());
    }

    #[test]
    fn conversion_keeps_the_classification() {
        let transient: carta_core::Error = Error::service_unavailable("restarting").into();
        assert_eq!(transient.code(), ErrorCode::TransientInferenceError);
        assert!(transient.message().starts_with("paddle service_unavailable"));

        let failure: carta_core::Error =
            Error::invalid_response("missing result", None).into();
        assert_eq!(failure.code(), ErrorCode::InferenceFailure);

        let api: carta_core::Error = Error::api(200, "bad base64", Some(1)).into();
        assert_eq!(api.code(), ErrorCode::InferenceFailure);

        let config: carta_core::Error = Error::config("bad url").into();
        assert_eq!(config.code(), ErrorCode::WorkerUnavailable);
    }

    #[test]
    fn categories() {
        assert_eq!(Error::timeout(Duration::from_secs(60)).category(), "timeout");
        assert_eq!(Error::rate_limit("x").category(), "rate_limit");
        assert_eq!(Error::api(500, "x", None).category(), "api");
        assert_eq!(Error::config("x").category(), "config");
    }
}
