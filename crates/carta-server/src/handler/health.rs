//! Service health endpoint.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use carta_inference::{HealthMonitor, MetricsAggregator};

use super::response::HealthResponse;
use crate::service::{ServiceState, Uptime};

/// Tracing target for health handlers.
const TRACING_TARGET: &str = "carta_server::handler::health";

#[tracing::instrument(skip_all)]
async fn health_status(
    State(monitor): State<HealthMonitor>,
    State(metrics): State<Arc<MetricsAggregator>>,
    State(uptime): State<Uptime>,
) -> HealthResponse {
    let snapshot = monitor.snapshot();
    let response = HealthResponse::new(snapshot, &metrics.snapshot(), uptime.elapsed().as_secs());

    tracing::debug!(
        target: TRACING_TARGET,
        status = %response.status,
        total_requests = response.metrics.total_requests,
        "health status requested"
    );

    response
}

/// Returns a [`Router`] with the health route.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/api/health", get(health_status))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use carta_core::ServiceStatus;
    use carta_inference::{DEPENDENCY_WORKER, ModelSession};
    use carta_test::ScriptedWorker;

    use super::*;
    use crate::handler::test::{create_test_server, create_test_server_with_session};

    #[tokio::test]
    async fn fresh_service_is_healthy() -> anyhow::Result<()> {
        let (server, _) = create_test_server(ScriptedWorker::new())?;

        let response = server.get("/api/health").await;

        response.assert_status_ok();
        let body = response.json::<HealthResponse>();
        assert_eq!(body.status, ServiceStatus::Healthy);
        assert_eq!(body.metrics.total_requests, 0);
        assert!(body.dependencies.contains_key(DEPENDENCY_WORKER));
        Ok(())
    }

    #[tokio::test]
    async fn failed_start_up_is_unavailable() -> anyhow::Result<()> {
        let session = ModelSession::unavailable("paddle health check failed");
        let (server, _) = create_test_server_with_session(session)?;

        let response = server.get("/api/health").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body = response.json::<HealthResponse>();
        assert_eq!(body.status, ServiceStatus::Unhealthy);
        assert!(
            body.dependencies[DEPENDENCY_WORKER]
                .detail
                .contains("paddle health check failed")
        );
        Ok(())
    }

    #[tokio::test]
    async fn failures_degrade_but_stay_reachable() -> anyhow::Result<()> {
        let (server, state) = create_test_server(ScriptedWorker::new())?;
        state
            .orchestrator()
            .reject(carta_core::Error::validation("unsupported version"));

        let response = server.get("/api/health").await;

        response.assert_status_ok();
        let body = response.json::<HealthResponse>();
        assert_eq!(body.status, ServiceStatus::Degraded);
        assert_eq!(body.metrics.failed_requests, 1);
        Ok(())
    }
}
