//! Error types for carta-ollama.

use thiserror::Error;

use crate::client::OllamaBuilderError;

/// Error type for the carta-ollama library.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport errors from reqwest (connect, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Ollama API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// `error` field of the body, or the raw body
        message: String,
    },

    /// The requested model is not available on the server.
    #[error("Model '{model}' is not available")]
    ModelNotFound {
        /// Model name or adapter tag
        model: String,
    },

    /// The body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an API error.
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns true if a later identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Api { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            Self::ModelNotFound { .. } | Self::InvalidResponse(_) | Self::Config(_) => false,
        }
    }

    /// Short label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Api { .. } => "api",
            Self::ModelNotFound { .. } => "model_not_found",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Config(_) => "config",
        }
    }
}

impl From<OllamaBuilderError> for Error {
    fn from(error: OllamaBuilderError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<Error> for carta_core::Error {
    fn from(error: Error) -> Self {
        let message = format!("ollama {}: {error}", error.category());
        let mapped = match &error {
            Error::Config(_) | Error::ModelNotFound { .. } => {
                carta_core::Error::worker_unavailable(message)
            }
            _ if error.is_retryable() => carta_core::Error::transient(message),
            _ => carta_core::Error::inference_failure(message),
        };
        mapped.with_source(error)
    }
}

/// Result type alias for carta-ollama operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use carta_core::ErrorCode;

    use super::*;

    #[test]
    fn classification() {
        let busy: carta_core::Error = Error::api_error(503, "loading").into();
        assert_eq!(busy.code(), ErrorCode::TransientInferenceError);

        let bad: carta_core::Error = Error::api_error(400, "invalid options").into();
        assert_eq!(bad.code(), ErrorCode::InferenceFailure);

        let missing: carta_core::Error = Error::ModelNotFound {
            model: "qwen3:0.6b".into(),
        }
        .into();
        assert_eq!(missing.code(), ErrorCode::WorkerUnavailable);
        assert!(missing.message().contains("qwen3:0.6b"));
    }
}
