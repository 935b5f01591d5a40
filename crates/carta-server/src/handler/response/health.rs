use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use carta_core::{DependencyHealth, HealthSnapshot, MetricsState, ServiceStatus};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Counters reported by `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Requests handled since start-up.
    pub total_requests: u64,
    /// Requests that returned extracted fields.
    pub successful_requests: u64,
    /// Requests that ended with an error.
    pub failed_requests: u64,
    /// Share of successful requests, 0 to 100.
    pub success_rate_percent: f64,
    /// Mean processing time over all requests.
    pub average_processing_time_seconds: f64,
    /// Retries summed over all requests.
    pub retry_total: u64,
}

impl From<&MetricsState> for HealthMetrics {
    fn from(state: &MetricsState) -> Self {
        Self {
            total_requests: state.total_requests,
            successful_requests: state.successful_requests,
            failed_requests: state.failed_requests,
            success_rate_percent: state.success_rate_percent(),
            average_processing_time_seconds: state.average_processing_time_seconds(),
            retry_total: state.retry_total,
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status, the worst of the dependencies.
    pub status: ServiceStatus,
    /// When the snapshot was taken.
    pub timestamp: Timestamp,
    /// Seconds since the service started.
    pub uptime_seconds: u64,
    /// Status of each dependency by name.
    pub dependencies: BTreeMap<String, DependencyHealth>,
    /// Request counters.
    pub metrics: HealthMetrics,
}

impl HealthResponse {
    /// Combines a health snapshot with the current counters.
    pub fn new(snapshot: HealthSnapshot, metrics: &MetricsState, uptime_seconds: u64) -> Self {
        Self {
            status: snapshot.overall,
            timestamp: snapshot.captured_at,
            uptime_seconds,
            dependencies: snapshot.dependencies,
            metrics: metrics.into(),
        }
    }

    /// 503 when unhealthy, 200 otherwise.
    pub fn status_code(&self) -> StatusCode {
        if self.status.is_operational() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
