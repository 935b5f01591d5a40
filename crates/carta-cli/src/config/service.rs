//! Retry, timeout, payload and health settings.

use std::time::Duration;

use anyhow::{Result as AnyhowResult, anyhow};
use carta_core::PayloadLimits;
use carta_inference::{HealthConfig, OrchestratorConfig, RetryConfig};
use carta_server::ServiceConfig;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// How each extraction request is bounded and retried.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ExtractionConfig {
    /// Total attempts per request, the first one included.
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    /// Seconds to wait after each failed attempt; the last value repeats.
    #[arg(
        long,
        env = "RETRY_BACKOFF_SCHEDULE",
        value_delimiter = ',',
        default_value = "5,10,20"
    )]
    pub backoff_schedule: Vec<u64>,

    /// Seconds allowed for one attempt, queueing included.
    #[arg(long, env = "ATTEMPT_TIMEOUT", default_value_t = 120)]
    pub attempt_timeout: u64,

    /// Seconds allowed for a whole request, retries included.
    #[arg(long, env = "EXTRACTION_DEADLINE", default_value_t = 300)]
    pub deadline: u64,

    /// Largest accepted image in bytes.
    #[arg(long, env = "MAX_IMAGE_BYTES", default_value_t = 16 * 1024 * 1024)]
    pub max_image_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_schedule: vec![5, 10, 20],
            attempt_timeout: 120,
            deadline: 300,
            max_image_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ExtractionConfig {
    /// Validates attempt and timing settings.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("Retry attempts must be at least 1"));
        }

        if self.backoff_schedule.is_empty() {
            return Err(anyhow!("Backoff schedule must list at least one delay"));
        }

        if self.attempt_timeout == 0 {
            return Err(anyhow!("Attempt timeout must be at least 1 second"));
        }

        if self.deadline < self.attempt_timeout {
            return Err(anyhow!(
                "Extraction deadline ({}s) is shorter than the attempt timeout ({}s)",
                self.deadline,
                self.attempt_timeout
            ));
        }

        if self.max_image_bytes == 0 {
            return Err(anyhow!("Maximum image size must be positive"));
        }

        Ok(())
    }

    /// Returns the orchestrator configuration.
    pub fn to_orchestrator(&self) -> OrchestratorConfig {
        let retry = RetryConfig::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                self.backoff_schedule
                    .iter()
                    .copied()
                    .map(Duration::from_secs)
                    .collect::<Vec<_>>(),
            )
            .with_deadline(Duration::from_secs(self.deadline));

        OrchestratorConfig {
            attempt_timeout: Duration::from_secs(self.attempt_timeout),
            retry,
            limits: PayloadLimits::new(self.max_image_bytes),
        }
    }
}

/// Thresholds used to derive service health.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct HealthArgs {
    /// Number of recent requests considered.
    #[arg(long, env = "HEALTH_WINDOW", default_value_t = 10)]
    pub health_window: usize,

    /// Success rate in percent below which the service is degraded.
    #[arg(long, env = "HEALTH_MIN_SUCCESS_RATE", default_value_t = 80.0)]
    pub health_min_success_rate: f64,

    /// Requests required in the window before the success rate counts.
    #[arg(long, env = "HEALTH_MIN_SAMPLES", default_value_t = 1)]
    pub health_min_samples: usize,

    /// Mean processing time in seconds above which the service is degraded.
    #[arg(long, env = "HEALTH_LATENCY_CEILING", default_value_t = 120)]
    pub health_latency_ceiling: u64,

    /// Seconds without a success after which a connectivity failure marks
    /// the worker unreachable.
    #[arg(long, env = "HEALTH_STALENESS", default_value_t = 300)]
    pub health_staleness: u64,
}

impl Default for HealthArgs {
    fn default() -> Self {
        Self {
            health_window: 10,
            health_min_success_rate: 80.0,
            health_min_samples: 1,
            health_latency_ceiling: 120,
            health_staleness: 300,
        }
    }
}

impl HealthArgs {
    /// Validates the thresholds.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.health_window == 0 {
            return Err(anyhow!("Health window must hold at least 1 request"));
        }

        if !(0.0..=100.0).contains(&self.health_min_success_rate) {
            return Err(anyhow!(
                "Minimum success rate {} is outside 0..=100",
                self.health_min_success_rate
            ));
        }

        Ok(())
    }

    /// Returns the monitor configuration.
    pub fn to_health(&self) -> HealthConfig {
        HealthConfig {
            window: self.health_window,
            min_success_rate: self.health_min_success_rate,
            min_samples: self.health_min_samples,
            latency_ceiling: Duration::from_secs(self.health_latency_ceiling),
            staleness: Duration::from_secs(self.health_staleness),
        }
    }
}

/// Combines both groups into the shared service configuration.
pub fn service_config(extraction: &ExtractionConfig, health: &HealthArgs) -> ServiceConfig {
    ServiceConfig {
        orchestrator: extraction.to_orchestrator(),
        health: health.to_health(),
    }
}

/// Logs the extraction and health settings.
pub fn log_service_config(extraction: &ExtractionConfig, health: &HealthArgs) {
    tracing::info!(
        target: TRACING_TARGET_CONFIG,
        max_attempts = extraction.max_attempts,
        backoff_schedule = ?extraction.backoff_schedule,
        attempt_timeout_secs = extraction.attempt_timeout,
        deadline_secs = extraction.deadline,
        max_image_bytes = extraction.max_image_bytes,
        "extraction configuration"
    );

    tracing::info!(
        target: TRACING_TARGET_CONFIG,
        window = health.health_window,
        min_success_rate = health.health_min_success_rate,
        min_samples = health.health_min_samples,
        latency_ceiling_secs = health.health_latency_ceiling,
        staleness_secs = health.health_staleness,
        "health configuration"
    );
}
