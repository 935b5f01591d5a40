//! Request orchestration: validation, bounded attempts, retries, deadline.
//!
//! Every call to [`RequestOrchestrator::handle`] produces exactly one
//! [`ExtractionResult`] and records exactly one outcome in the
//! [`MetricsAggregator`].

use std::sync::Arc;
use std::time::Duration;

use carta_core::{
    Error, ExtractionInput, ExtractionRequest, ExtractionResult, InferenceOutput, Outcome,
    PayloadLimits,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::TRACING_TARGET_ORCHESTRATOR;
use crate::metrics::MetricsAggregator;
use crate::retry::{RetryConfig, RetryDecision, RetryPolicy, StopReason};
use crate::session::ModelSession;

/// Configuration of the request orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound for a single attempt, queueing included.
    pub attempt_timeout: Duration,
    /// Retry schedule and overall deadline.
    pub retry: RetryConfig,
    /// Payload bounds checked during validation.
    pub limits: PayloadLimits,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
            limits: PayloadLimits::default(),
        }
    }
}

/// Drives extraction requests through the model session.
#[derive(Debug, Clone)]
pub struct RequestOrchestrator {
    session: Arc<ModelSession>,
    metrics: Arc<MetricsAggregator>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    limits: PayloadLimits,
}

impl RequestOrchestrator {
    /// Creates an orchestrator over a session and a metrics aggregator.
    pub fn new(
        session: Arc<ModelSession>,
        metrics: Arc<MetricsAggregator>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            session,
            metrics,
            policy: RetryPolicy::new(config.retry),
            attempt_timeout: config.attempt_timeout,
            limits: config.limits,
        }
    }

    /// Returns the payload limits enforced by validation.
    #[inline]
    pub fn limits(&self) -> &PayloadLimits {
        &self.limits
    }

    /// Returns the retry policy.
    #[inline]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Handles one submission from validation to the final result.
    pub async fn handle(&self, input: ExtractionInput) -> ExtractionResult {
        let started = Instant::now();
        let request_id = input.request_id;

        let request = match input.validate(&self.limits) {
            Ok(request) => request,
            Err(error) => {
                tracing::info!(
                    target: TRACING_TARGET_ORCHESTRATOR,
                    %request_id,
                    error_code = %error.code(),
                    error = %error.message(),
                    "request rejected by validation"
                );
                return self.fail(request_id, &error, started.elapsed(), 0);
            }
        };

        tracing::info!(
            target: TRACING_TARGET_ORCHESTRATOR,
            %request_id,
            version = %request.version,
            side = %request.side,
            thinking_mode = request.thinking_mode,
            image_bytes = request.image.len(),
            "extraction started"
        );

        let (result, retry_count) = self.dispatch(&request, started).await;
        let processing_time = started.elapsed();

        match result {
            Ok(output) => {
                tracing::info!(
                    target: TRACING_TARGET_ORCHESTRATOR,
                    %request_id,
                    retry_count,
                    processing_time_ms = processing_time.as_millis(),
                    fields = output.fields.len(),
                    "extraction succeeded"
                );
                self.metrics
                    .record(Outcome::Success, processing_time, retry_count);
                ExtractionResult::success(request_id, output, processing_time, retry_count)
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_ORCHESTRATOR,
                    %request_id,
                    retry_count,
                    processing_time_ms = processing_time.as_millis(),
                    error_code = %error.code(),
                    error = %error.message(),
                    "extraction failed"
                );
                self.fail(request_id, &error, processing_time, retry_count)
            }
        }
    }

    /// Records a submission that was rejected before it could be handled.
    ///
    /// Transports call this for boundary problems such as an undecodable
    /// request body, so the failure is counted like any other.
    pub fn reject(&self, error: Error) -> ExtractionResult {
        let request_id = Uuid::now_v7();
        tracing::info!(
            target: TRACING_TARGET_ORCHESTRATOR,
            %request_id,
            error_code = %error.code(),
            error = %error.message(),
            "request rejected at the transport boundary"
        );
        self.fail(request_id, &error, Duration::ZERO, 0)
    }

    /// Runs attempts until success, a stop decision or the deadline.
    ///
    /// Returns the final outcome and the index of the last attempt.
    async fn dispatch(
        &self,
        request: &ExtractionRequest,
        started: Instant,
    ) -> (Result<InferenceOutput, Error>, u32) {
        let deadline = started + self.policy.deadline();
        let mut attempt: u32 = 0;

        loop {
            let now = Instant::now();
            if now >= deadline {
                // The scheduled attempt never ran.
                return (Err(self.deadline_error()), attempt.saturating_sub(1));
            }

            let limit = self.attempt_timeout.min(deadline - now);
            let error = match self.session.infer_within(request, limit).await {
                Ok(output) => return (Ok(output), attempt),
                Err(error) => error,
            };

            if Instant::now() >= deadline {
                return (Err(self.deadline_error()), attempt);
            }

            match self.policy.decide(attempt, &error, started.elapsed()) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::debug!(
                        target: TRACING_TARGET_ORCHESTRATOR,
                        request_id = %request.request_id,
                        attempt,
                        backoff_ms = delay.as_millis(),
                        error_code = %error.code(),
                        "retrying after backoff"
                    );
                    tokio::time::sleep_until((Instant::now() + delay).min(deadline)).await;
                    attempt += 1;
                }
                RetryDecision::Stop(StopReason::DeadlineExceeded) => {
                    return (Err(self.deadline_error()), attempt);
                }
                RetryDecision::Stop(reason) => {
                    tracing::debug!(
                        target: TRACING_TARGET_ORCHESTRATOR,
                        request_id = %request.request_id,
                        attempt,
                        ?reason,
                        "not retrying"
                    );
                    return (Err(error), attempt);
                }
            }
        }
    }

    fn deadline_error(&self) -> Error {
        Error::timeout(format!(
            "extraction did not complete within the {}s deadline",
            self.policy.deadline().as_secs()
        ))
    }

    fn fail(
        &self,
        request_id: Uuid,
        error: &Error,
        processing_time: Duration,
        retry_count: u32,
    ) -> ExtractionResult {
        self.metrics
            .record(Outcome::Failure, processing_time, retry_count);
        ExtractionResult::failure(request_id, error, processing_time, retry_count)
    }
}
