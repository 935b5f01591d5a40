//! Server error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for server operations.
pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// Failures while serving either transport.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the REST listener.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The REST server stopped with an error.
    #[error("HTTP server error: {0}")]
    Http(#[source] io::Error),

    /// The gRPC server failed to bind or stopped with an error.
    #[error("gRPC server error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// In-flight requests did not finish within the shutdown timeout.
    #[error("Shutdown did not complete within {}s", .0.as_secs())]
    ShutdownTimeout(Duration),
}

impl ServerError {
    /// Creates a bind error with address context.
    pub fn bind_error(address: impl ToString, source: io::Error) -> Self {
        Self::BindError {
            address: address.to_string(),
            source,
        }
    }

    /// Returns a unique error code for this error type.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BindError { .. } => "E001",
            Self::Http(_) => "E002",
            Self::Grpc(_) => "E003",
            Self::ShutdownTimeout(_) => "E004",
        }
    }

    /// Provides a human-readable suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::BindError { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => {
                    Some("Try using a port above 1024 or run with appropriate privileges")
                }
                io::ErrorKind::AddrInUse => Some(
                    "The port is already in use. Try a different port or stop the conflicting service",
                ),
                io::ErrorKind::AddrNotAvailable => {
                    Some("The address is not available. Check network interface configuration")
                }
                _ => Some("Check network configuration and firewall settings"),
            },
            Self::Grpc(_) => Some("Check that the gRPC port is free and reachable"),
            Self::ShutdownTimeout(_) => {
                Some("Increase SHUTDOWN_TIMEOUT if extractions regularly outlive it")
            }
            Self::Http(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_unique() {
        let codes = [
            ServerError::bind_error("0.0.0.0:8080", io::Error::other("test")).error_code(),
            ServerError::Http(io::Error::other("test")).error_code(),
            ServerError::ShutdownTimeout(Duration::from_secs(30)).error_code(),
        ];

        for i in 0..codes.len() {
            for j in i + 1..codes.len() {
                assert_ne!(codes[i], codes[j]);
            }
        }
    }

    #[test]
    fn bind_errors_have_suggestions() {
        let error = ServerError::bind_error(
            "0.0.0.0:80",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );

        assert!(error.suggestion().is_some_and(|s| s.contains("already in use")));
        assert!(error.to_string().contains("0.0.0.0:80"));
    }
}
