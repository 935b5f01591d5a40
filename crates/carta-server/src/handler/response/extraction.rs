//! JSON body returned by `POST /api/extract`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use carta_core::{ErrorCode, ExtractionResult, Fields};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timing and retry information attached to every extraction response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Correlation id of the request.
    pub request_id: Uuid,
    /// Seconds from receipt to the terminal outcome.
    pub processing_time: f64,
    /// Retries performed (attempts minus one).
    pub retry_count: u32,
    /// When the result was produced.
    pub timestamp: Timestamp,
}

/// Outcome of an extraction as seen by REST clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionResponse {
    /// Fields were extracted.
    Success {
        /// Always `true`.
        success: bool,
        /// Recognized text.
        raw_text: String,
        /// One key per schema field; unreadable fields are null.
        extracted_data: Fields,
        /// Timing and retries.
        meta: ResponseMeta,
    },
    /// The request failed.
    Failure {
        /// Always `false`.
        success: bool,
        /// Human-readable description.
        error: String,
        /// Stable classification.
        error_code: ErrorCode,
        /// Whether resubmitting may succeed.
        can_retry: bool,
        /// Timing and retries.
        meta: ResponseMeta,
    },
}

impl ExtractionResponse {
    /// HTTP status for this outcome.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Success { .. } => StatusCode::OK,
            Self::Failure { error_code, .. } => status_for(*error_code),
        }
    }
}

/// Maps an error classification to its HTTP status.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::InferenceFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::WorkerUnavailable | ErrorCode::TransientInferenceError => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ExtractionResult> for ExtractionResponse {
    fn from(result: ExtractionResult) -> Self {
        let meta = ResponseMeta {
            request_id: result.request_id,
            processing_time: result.processing_time.as_secs_f64(),
            retry_count: result.retry_count,
            timestamp: result.timestamp,
        };

        match result.error {
            None if result.success => Self::Success {
                success: true,
                raw_text: result.raw_text.unwrap_or_default(),
                extracted_data: result.extracted_fields,
                meta,
            },
            Some(info) => Self::Failure {
                success: false,
                error: info.message,
                error_code: info.code,
                can_retry: info.retryable,
                meta,
            },
            None => Self::Failure {
                success: false,
                error: "result carries neither fields nor an error".to_owned(),
                error_code: ErrorCode::InternalError,
                can_retry: false,
                meta,
            },
        }
    }
}

impl IntoResponse for ExtractionResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use carta_core::Error;
    use carta_test::fixtures;
    use serde_json::json;

    use super::*;

    #[test]
    fn every_code_has_a_status() {
        assert_eq!(status_for(ErrorCode::ValidationError), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorCode::InferenceFailure),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorCode::WorkerUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(ErrorCode::TransientInferenceError),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(ErrorCode::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(ErrorCode::InternalError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn success_shape() {
        let result = ExtractionResult::success(
            Uuid::now_v7(),
            fixtures::sample_output(),
            Duration::from_millis(2500),
            1,
        );

        let json = serde_json::to_value(ExtractionResponse::from(result)).unwrap();
        assert_eq!(json["success"], json!(true));
        assert_eq!(json["extracted_data"]["nom"], json!("NGONO"));
        assert_eq!(json["meta"]["processing_time"], json!(2.5));
        assert_eq!(json["meta"]["retry_count"], json!(1));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_shape() {
        let error = Error::transient("connection refused");
        let result =
            ExtractionResult::failure(Uuid::now_v7(), &error, Duration::from_secs(35), 2);

        let response = ExtractionResponse::from(result);
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["success"], json!(false));
        assert_eq!(json["error_code"], json!("TRANSIENT_INFERENCE_ERROR"));
        assert_eq!(json["can_retry"], json!(true));
        assert!(json.get("extracted_data").is_none());
    }
}
