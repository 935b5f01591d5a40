//! Serving both transports until shutdown.
//!
//! The REST and gRPC servers share one cancellation token. A shutdown signal
//! or a fatal error in either server cancels it, and both then drain their
//! in-flight requests for at most the configured shutdown timeout.

mod error;
mod shutdown;

use std::time::Instant;

use axum::Router;
use carta_server::grpc::ExtractionGrpc;
pub use error::{Result, ServerError};
use shutdown::shutdown_signal;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Serves `router` over HTTP and `grpc` over gRPC until a shutdown signal.
pub async fn serve(router: Router, grpc: ExtractionGrpc, config: &ServerConfig) -> Result<()> {
    let start_time = Instant::now();

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(http_addr).await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %http_addr,
            error = %err,
            "failed to bind to address"
        );
        ServerError::bind_error(http_addr, err)
    })?;

    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "server bound to all interfaces (0.0.0.0), ensure firewall is configured"
        );
    }

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    let http = {
        let token = token.clone();
        async move {
            tracing::info!(
                target: TRACING_TARGET_SERVER_STARTUP,
                addr = %http_addr,
                "REST server listening"
            );

            let result = axum::serve(listener, router)
                .with_graceful_shutdown(token.clone().cancelled_owned())
                .await
                .map_err(ServerError::Http);
            token.cancel();
            result
        }
    };

    let grpc_addr = config.grpc_addr();
    let grpc = {
        let token = token.clone();
        async move {
            tracing::info!(
                target: TRACING_TARGET_SERVER_STARTUP,
                addr = %grpc_addr,
                "gRPC server listening"
            );

            let result = tonic::transport::Server::builder()
                .add_service(grpc.into_server())
                .serve_with_shutdown(grpc_addr, token.clone().cancelled_owned())
                .await
                .map_err(ServerError::from);
            token.cancel();
            result
        }
    };

    let servers = async { tokio::join!(http, grpc) };
    let shutdown_timeout = config.shutdown_timeout();
    let deadline = async {
        token.cancelled().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    let (http_result, grpc_result) = tokio::select! {
        results = servers => results,
        () = deadline => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = shutdown_timeout.as_secs(),
                "in-flight requests did not finish before the shutdown timeout"
            );
            return Err(ServerError::ShutdownTimeout(shutdown_timeout));
        }
    };

    http_result?;
    grpc_result?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        uptime_secs = start_time.elapsed().as_secs(),
        "servers stopped"
    );

    Ok(())
}
