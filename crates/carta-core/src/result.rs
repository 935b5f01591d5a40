//! Worker output and the normalized per-request result.

use std::time::Duration;

use jiff::Timestamp;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, ErrorCode, ErrorInfo};

/// Extracted fields keyed by field name.
pub type Fields = Map<String, Value>;

/// What a single successful inference call produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceOutput {
    /// Recognized text after preprocessing, joined with spaces.
    pub raw_text: String,
    /// Structured fields for the requested version and side.
    pub fields: Fields,
}

impl InferenceOutput {
    /// Creates a new output.
    pub fn new(raw_text: impl Into<String>, fields: Fields) -> Self {
        Self {
            raw_text: raw_text.into(),
            fields,
        }
    }
}

/// Normalized outcome of one extraction request.
///
/// Built exactly once per request by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Correlation id of the request.
    pub request_id: Uuid,
    /// Whether fields were extracted.
    pub success: bool,
    /// Recognized text, present on success.
    pub raw_text: Option<String>,
    /// Extracted fields, empty on failure.
    pub extracted_fields: Fields,
    /// Failure description, present on failure.
    pub error: Option<ErrorInfo>,
    /// Time from the start of handling to the terminal outcome.
    pub processing_time: Duration,
    /// Number of retries performed (attempts minus one).
    pub retry_count: u32,
    /// When the result was produced.
    pub timestamp: Timestamp,
}

impl ExtractionResult {
    /// Creates a successful result.
    pub fn success(
        request_id: Uuid,
        output: InferenceOutput,
        processing_time: Duration,
        retry_count: u32,
    ) -> Self {
        Self {
            request_id,
            success: true,
            raw_text: Some(output.raw_text),
            extracted_fields: output.fields,
            error: None,
            processing_time,
            retry_count,
            timestamp: Timestamp::now(),
        }
    }

    /// Creates a failed result.
    pub fn failure(
        request_id: Uuid,
        error: &Error,
        processing_time: Duration,
        retry_count: u32,
    ) -> Self {
        Self {
            request_id,
            success: false,
            raw_text: None,
            extracted_fields: Fields::new(),
            error: Some(error.to_info()),
            processing_time,
            retry_count,
            timestamp: Timestamp::now(),
        }
    }

    /// Returns the error code of a failed result.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|info| info.code)
    }
}
