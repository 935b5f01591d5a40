#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod metrics;
mod monitor;
mod orchestrator;
mod pipeline;
mod retry;
mod session;

pub use carta_core::{Error, ErrorCode, Result};
pub use metrics::{DEFAULT_WINDOW, MetricsAggregator};
pub use monitor::{
    DEPENDENCY_LATENCY, DEPENDENCY_QUEUE, DEPENDENCY_SUCCESS_RATE, DEPENDENCY_WORKER,
    HealthConfig, HealthMonitor,
};
pub use orchestrator::{OrchestratorConfig, RequestOrchestrator};
pub use pipeline::PipelineWorker;
pub use retry::{RetryConfig, RetryDecision, RetryPolicy, StopReason};
pub use session::{AttemptOutcome, Liveness, ModelSession};

/// Tracing target for model session operations.
pub const TRACING_TARGET_SESSION: &str = "carta_inference::session";

/// Tracing target for request orchestration.
pub const TRACING_TARGET_ORCHESTRATOR: &str = "carta_inference::orchestrator";

/// Tracing target for the recognition and post-processing pipeline.
pub const TRACING_TARGET_PIPELINE: &str = "carta_inference::pipeline";

/// Tracing target for metrics aggregation.
pub const TRACING_TARGET_METRICS: &str = "carta_inference::metrics";
