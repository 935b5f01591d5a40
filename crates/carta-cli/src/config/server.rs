//! Listener configuration for both transports.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Result as AnyhowResult, anyhow};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Bind addresses and shutdown behavior.
///
/// # Environment Variables
///
/// - `HTTP_HOST`, `HTTP_PORT` - REST listener (default: 0.0.0.0:8080)
/// - `GRPC_HOST`, `GRPC_PORT` - gRPC listener (default: 0.0.0.0:50051)
/// - `SHUTDOWN_TIMEOUT` - Graceful shutdown timeout in seconds (default: 30)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Host address for the REST listener.
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    #[serde(default = "default_host")]
    pub http_host: IpAddr,

    /// TCP port for the REST listener.
    #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Host address for the gRPC listener.
    #[arg(long, env = "GRPC_HOST", default_value = "0.0.0.0")]
    #[serde(default = "default_host")]
    pub grpc_host: IpAddr,

    /// TCP port for the gRPC listener.
    #[arg(long, env = "GRPC_PORT", default_value_t = 50051)]
    pub grpc_port: u16,

    /// Maximum time in seconds to wait for in-flight requests on shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 30)]
    pub shutdown_timeout: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl ServerConfig {
    /// Validates listener settings.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.http_addr() == self.grpc_addr() {
            return Err(anyhow!(
                "REST and gRPC listeners cannot share {}",
                self.http_addr()
            ));
        }

        if self.shutdown_timeout == 0 {
            return Err(anyhow!("Shutdown timeout must be at least 1 second"));
        }

        Ok(())
    }

    /// Socket address of the REST listener.
    #[must_use]
    pub const fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_host, self.http_port)
    }

    /// Socket address of the gRPC listener.
    #[must_use]
    pub const fn grpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.grpc_host, self.grpc_port)
    }

    /// Returns the graceful shutdown timeout as a `Duration`.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// Returns whether either listener binds to all interfaces.
    #[must_use]
    pub const fn binds_to_all_interfaces(&self) -> bool {
        self.http_host.is_unspecified() || self.grpc_host.is_unspecified()
    }

    /// Logs the listener configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            http_addr = %self.http_addr(),
            grpc_addr = %self.grpc_addr(),
            shutdown_timeout_secs = self.shutdown_timeout,
            "server configuration"
        );
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: default_host(),
            http_port: 8080,
            grpc_host: default_host(),
            grpc_port: 50051,
            shutdown_timeout: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.binds_to_all_interfaces());
        assert_eq!(config.http_addr().port(), 8080);
        assert_eq!(config.grpc_addr().port(), 50051);
    }

    #[test]
    fn reject_shared_address() {
        let config = ServerConfig {
            grpc_port: 8080,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_shutdown_timeout() {
        let config = ServerConfig {
            shutdown_timeout: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
