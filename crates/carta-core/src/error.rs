//! Error taxonomy for extraction requests.
//!
//! Every failure that can reach a client is classified into one of the
//! [`ErrorCode`] variants at the point where it is detected. The code carries
//! a stable wire string and decides whether the orchestrator may retry.
//!
//! # Examples
//!
//! ```rust
//! use carta_core::{Error, ErrorCode};
//!
//! let transient = Error::transient("connection reset by peer");
//! assert!(transient.is_retryable());
//!
//! let invalid = Error::validation("unsupported document version '1999'");
//! assert_eq!(invalid.code(), ErrorCode::ValidationError);
//! assert!(!invalid.is_retryable());
//! assert_eq!(invalid.code().as_ref(), "VALIDATION_ERROR");
//! ```

use std::borrow::Cow;
use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for extraction operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Closed set of error classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr, IntoStaticStr, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or oversized payload, or an unrecognized version/side.
    ValidationError,
    /// The worker failed to initialize or is confirmed unreachable.
    WorkerUnavailable,
    /// Connectivity hiccup or a single-attempt timeout.
    TransientInferenceError,
    /// The worker ran but its output cannot be interpreted.
    InferenceFailure,
    /// The overall deadline was exceeded.
    Timeout,
    /// Anything not otherwise classified.
    InternalError,
}

impl ErrorCode {
    /// Returns true if an attempt failing with this code may be retried.
    #[inline]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientInferenceError)
    }

    /// Returns true if the failure is caused by the request itself.
    #[inline]
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::ValidationError)
    }

    /// Returns true if the failure means the worker could not be reached.
    #[inline]
    pub const fn is_connectivity(self) -> bool {
        matches!(self, Self::WorkerUnavailable | Self::TransientInferenceError)
    }
}

/// Error raised by the core and its engine adapters.
///
/// The [`ErrorCode`] is fixed at construction and propagated unchanged up to
/// the client-visible [`ErrorInfo`].
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Error {
    code: ErrorCode,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the classification of this error.
    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the orchestrator may retry after this error.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Converts the error into its client-visible form.
    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code,
            message: self.message.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

// Convenience constructors, one per classification.
impl Error {
    /// Creates a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Creates a worker unavailable error.
    pub fn worker_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::WorkerUnavailable, message)
    }

    /// Creates a transient (retryable) inference error.
    pub fn transient(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::TransientInferenceError, message)
    }

    /// Creates an inference failure.
    pub fn inference_failure(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InferenceFailure, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// Client-visible description of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable classification.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Whether resubmitting the same request may succeed.
    pub retryable: bool,
}

impl From<&Error> for ErrorInfo {
    fn from(error: &Error) -> Self {
        error.to_info()
    }
}
