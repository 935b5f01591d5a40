//! Health derivation from session liveness and recent outcomes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use carta_core::{DependencyHealth, HealthSnapshot, RecentWindow};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::metrics::MetricsAggregator;
use crate::session::{AttemptOutcome, Liveness, ModelSession};

/// Name of the worker dependency.
pub const DEPENDENCY_WORKER: &str = "worker";
/// Name of the queue dependency.
pub const DEPENDENCY_QUEUE: &str = "queue";
/// Name of the success rate dependency.
pub const DEPENDENCY_SUCCESS_RATE: &str = "success_rate";
/// Name of the latency dependency.
pub const DEPENDENCY_LATENCY: &str = "latency";

/// Thresholds for health derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Number of recent requests considered.
    pub window: usize,
    /// Success rate (percent) below which the service is degraded.
    pub min_success_rate: f64,
    /// Samples required before the success rate is judged.
    pub min_samples: usize,
    /// Mean processing time above which the service is degraded.
    pub latency_ceiling: Duration,
    /// A connectivity failure with no success within this span means the
    /// worker is unreachable.
    pub staleness: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window: 10,
            min_success_rate: 80.0,
            min_samples: 1,
            latency_ceiling: Duration::from_secs(120),
            staleness: Duration::from_secs(300),
        }
    }
}

impl HealthConfig {
    /// Derives a snapshot from explicit inputs.
    ///
    /// The dependency statuses depend only on the arguments.
    pub fn evaluate(
        &self,
        liveness: &Liveness,
        window: &RecentWindow,
        now: Instant,
    ) -> HealthSnapshot {
        let mut dependencies = BTreeMap::new();
        dependencies.insert(DEPENDENCY_WORKER.to_owned(), self.worker(liveness, now));
        dependencies.insert(DEPENDENCY_QUEUE.to_owned(), Self::queue(liveness));
        dependencies.insert(DEPENDENCY_SUCCESS_RATE.to_owned(), self.success_rate(window));
        dependencies.insert(DEPENDENCY_LATENCY.to_owned(), self.latency(window));

        HealthSnapshot::from_dependencies(dependencies, Timestamp::now())
    }

    fn worker(&self, liveness: &Liveness, now: Instant) -> DependencyHealth {
        if !liveness.initialized {
            let reason = liveness.init_error.as_deref().unwrap_or("not loaded");
            return DependencyHealth::unhealthy(format!("failed to initialize: {reason}"));
        }

        let Some(outcome) = liveness.last_outcome else {
            return DependencyHealth::healthy("loaded, no requests yet");
        };

        let AttemptOutcome::Failed(code) = outcome else {
            return DependencyHealth::healthy("reachable");
        };

        if !outcome.is_connectivity_failure() {
            return DependencyHealth::healthy(format!("reachable, last call failed with {code}"));
        }

        match liveness.last_success {
            Some(at) if now.saturating_duration_since(at) <= self.staleness => {
                DependencyHealth::healthy(format!(
                    "last call failed with {code}, last success {}s ago",
                    now.saturating_duration_since(at).as_secs()
                ))
            }
            Some(at) => DependencyHealth::unhealthy(format!(
                "unreachable: last call failed with {code}, last success {}s ago",
                now.saturating_duration_since(at).as_secs()
            )),
            None => DependencyHealth::unhealthy(format!(
                "unreachable: last call failed with {code}, no successful call yet"
            )),
        }
    }

    fn queue(liveness: &Liveness) -> DependencyHealth {
        let state = if liveness.in_flight { "busy" } else { "idle" };
        DependencyHealth::healthy(format!("{state}, {} waiting", liveness.queue_depth))
    }

    fn success_rate(&self, window: &RecentWindow) -> DependencyHealth {
        let samples = window.len();
        match window.success_rate_percent() {
            Some(rate) if samples >= self.min_samples.max(1) => {
                let detail = format!("{rate:.1}% over last {samples} requests");
                if rate < self.min_success_rate {
                    DependencyHealth::degraded(detail)
                } else {
                    DependencyHealth::healthy(detail)
                }
            }
            _ => DependencyHealth::healthy(format!(
                "not enough samples ({samples} of {})",
                self.min_samples.max(1)
            )),
        }
    }

    fn latency(&self, window: &RecentWindow) -> DependencyHealth {
        let Some(mean) = window.mean_processing_time() else {
            return DependencyHealth::healthy("no samples");
        };

        let detail = format!(
            "mean {:.2}s over last {} requests",
            mean.as_secs_f64(),
            window.len()
        );
        if mean > self.latency_ceiling {
            DependencyHealth::degraded(detail)
        } else {
            DependencyHealth::healthy(detail)
        }
    }
}

/// Computes health snapshots from live session and metrics state.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    session: Arc<ModelSession>,
    metrics: Arc<MetricsAggregator>,
    config: HealthConfig,
}

impl HealthMonitor {
    /// Creates a monitor over the session and metrics.
    pub fn new(
        session: Arc<ModelSession>,
        metrics: Arc<MetricsAggregator>,
        config: HealthConfig,
    ) -> Self {
        Self {
            session,
            metrics,
            config,
        }
    }

    /// Returns a fresh snapshot. Never waits for the worker slot.
    pub fn snapshot(&self) -> HealthSnapshot {
        self.config.evaluate(
            &self.session.liveness(),
            &self.metrics.recent(),
            Instant::now(),
        )
    }

    /// Returns the thresholds.
    #[inline]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }
}
