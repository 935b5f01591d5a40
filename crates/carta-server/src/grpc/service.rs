use std::sync::Arc;

use carta_core::{ExtractionInput, ExtractionResult};
use carta_inference::{HealthMonitor, MetricsAggregator, RequestOrchestrator};
use serde_json::Value;
use tonic::{Request, Response, Status};

use super::proto::extraction_service_server::{ExtractionService, ExtractionServiceServer};
use super::proto::{ExtractRequest, ExtractResponse, HealthRequest, HealthResponse};
use crate::service::ServiceState;

/// Tracing target for gRPC handlers.
const TRACING_TARGET: &str = "carta_server::grpc";

const DEFAULT_VERSION: &str = "2018";
const DEFAULT_SIDE: &str = "recto";

/// Implementation of `carta.v1.ExtractionService`.
#[derive(Debug, Clone)]
pub struct ExtractionGrpc {
    orchestrator: RequestOrchestrator,
    monitor: HealthMonitor,
    metrics: Arc<MetricsAggregator>,
    max_message_size: usize,
}

impl ExtractionGrpc {
    /// Creates the service over the shared state.
    pub fn new(state: &ServiceState) -> Self {
        Self {
            orchestrator: state.orchestrator().clone(),
            monitor: state.monitor().clone(),
            metrics: Arc::clone(state.metrics()),
            max_message_size: state.max_body_size(),
        }
    }

    /// Wraps the service for `tonic::transport::Server`, accepting messages
    /// up to the configured body size.
    pub fn into_server(self) -> ExtractionServiceServer<Self> {
        let limit = self.max_message_size;
        ExtractionServiceServer::new(self).max_decoding_message_size(limit)
    }
}

/// Proto3 cannot tell an empty string from an absent one; both select the default.
fn or_default(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_owned()
    } else {
        trimmed.to_owned()
    }
}

impl From<ExtractRequest> for ExtractionInput {
    fn from(request: ExtractRequest) -> Self {
        ExtractionInput::new(
            request.image_data,
            or_default(request.version, DEFAULT_VERSION),
            or_default(request.side, DEFAULT_SIDE),
        )
        .with_thinking_mode(request.thinking_mode)
    }
}

impl From<ExtractionResult> for ExtractResponse {
    fn from(result: ExtractionResult) -> Self {
        let processing_time_ms =
            u64::try_from(result.processing_time.as_millis()).unwrap_or(u64::MAX);
        let mut response = Self {
            success: result.success,
            processing_time_ms,
            retry_count: result.retry_count,
            timestamp: result.timestamp.to_string(),
            request_id: result.request_id.to_string(),
            ..Self::default()
        };

        match result.error {
            Some(info) => {
                response.error = info.message;
                response.error_code = info.code.as_ref().to_owned();
                response.retryable = info.retryable;
            }
            None => {
                response.raw_text = result.raw_text.unwrap_or_default();
                response.extracted_data = Value::Object(result.extracted_fields).to_string();
            }
        }

        response
    }
}

#[tonic::async_trait]
impl ExtractionService for ExtractionGrpc {
    #[tracing::instrument(skip_all)]
    async fn extract(
        &self,
        request: Request<ExtractRequest>,
    ) -> Result<Response<ExtractResponse>, Status> {
        let request = request.into_inner();
        tracing::debug!(
            target: TRACING_TARGET,
            image_bytes = request.image_data.len(),
            version = %request.version,
            side = %request.side,
            thinking_mode = request.thinking_mode,
            "extract request received"
        );

        let result = self.orchestrator.handle(request.into()).await;
        Ok(Response::new(result.into()))
    }

    #[tracing::instrument(skip_all)]
    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        let snapshot = self.monitor.snapshot();
        let metrics = self.metrics.snapshot();

        let dependencies = snapshot
            .dependencies
            .into_iter()
            .map(|(name, health)| (name, format!("{}: {}", health.status, health.detail)))
            .collect();

        tracing::debug!(
            target: TRACING_TARGET,
            status = %snapshot.overall,
            "health request received"
        );

        Ok(Response::new(HealthResponse {
            status: snapshot.overall.to_string(),
            total_requests: metrics.total_requests,
            successful_requests: metrics.successful_requests,
            failed_requests: metrics.failed_requests,
            success_rate_percent: metrics.success_rate_percent(),
            average_processing_time_seconds: metrics.average_processing_time_seconds(),
            dependencies,
            retry_total: metrics.retry_total,
        }))
    }
}
