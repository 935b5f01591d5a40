#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use carta_server::grpc::ExtractionGrpc;
use carta_server::handler::routes;
use carta_server::middleware::{
    RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
};
use carta_server::service::ServiceState;

use crate::config::{Cli, create_session, init_tracing};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "carta_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "carta_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "carta_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    init_tracing(cli.log_format)?;
    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting carta"
    );

    cli.log();
    cli.validate()?;

    let worker = cli
        .worker
        .create_worker()
        .context("failed to create inference worker")?;
    let session = Arc::new(create_session(worker).await);

    let state = ServiceState::new(Arc::clone(&session), cli.service_config());
    let router = create_router(state.clone(), &cli.recovery);
    let grpc = ExtractionGrpc::new(&state);

    let served = server::serve(router, grpc, &cli.server).await;
    session.shutdown().await;

    if let Err(error) = &served {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error_code = error.error_code(),
            suggestion = error.suggestion(),
            "server stopped with an error"
        );
    }

    served.context("server failure")
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Security - request body limit
/// 4. Routes (innermost) - actual request handlers
fn create_router(state: ServiceState, recovery: &RecoveryConfig) -> Router {
    let body_limit = state.max_body_size();

    routes()
        .with_state(state)
        .with_body_limit(body_limit)
        .with_observability()
        .with_recovery(recovery)
}
