use std::sync::Arc;
use std::time::{Duration, Instant};

use carta_inference::{
    HealthConfig, HealthMonitor, MetricsAggregator, ModelSession, OrchestratorConfig,
    RequestOrchestrator,
};

/// Settings shared by both transports.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Retry schedule, timeouts and payload limits.
    pub orchestrator: OrchestratorConfig,
    /// Health thresholds. `health.window` also sizes the metrics window.
    pub health: HealthConfig,
}

impl ServiceConfig {
    /// Largest request body accepted by either transport: the image limit
    /// plus room for multipart or protobuf framing.
    pub fn max_body_size(&self) -> usize {
        self.orchestrator
            .limits
            .max_image_bytes
            .saturating_add(1024 * 1024)
    }
}

/// Time since the service state was created.
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started_at: Instant,
}

impl Uptime {
    fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// Elapsed time since start-up.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection) and shared with
/// the gRPC service.
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    session: Arc<ModelSession>,
    metrics: Arc<MetricsAggregator>,
    orchestrator: RequestOrchestrator,
    monitor: HealthMonitor,
    uptime: Uptime,
    max_body_size: usize,
}

impl ServiceState {
    /// Wires the orchestrator, metrics and health monitor around a session.
    pub fn new(session: Arc<ModelSession>, config: ServiceConfig) -> Self {
        let max_body_size = config.max_body_size();
        let metrics = Arc::new(MetricsAggregator::new(config.health.window));
        let orchestrator = RequestOrchestrator::new(
            Arc::clone(&session),
            Arc::clone(&metrics),
            config.orchestrator,
        );
        let monitor = HealthMonitor::new(Arc::clone(&session), Arc::clone(&metrics), config.health);

        Self {
            session,
            metrics,
            orchestrator,
            monitor,
            uptime: Uptime::start(),
            max_body_size,
        }
    }

    /// The model session backing the orchestrator.
    pub fn session(&self) -> &Arc<ModelSession> {
        &self.session
    }

    /// The request orchestrator.
    pub fn orchestrator(&self) -> &RequestOrchestrator {
        &self.orchestrator
    }

    /// The health monitor.
    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    /// The metrics aggregator.
    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    /// Time since start-up.
    pub fn uptime(&self) -> Uptime {
        self.uptime
    }

    /// Largest request body accepted by either transport.
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(orchestrator: RequestOrchestrator);
impl_di!(monitor: HealthMonitor);
impl_di!(metrics: Arc<MetricsAggregator>);
impl_di!(uptime: Uptime);
