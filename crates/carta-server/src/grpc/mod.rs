//! gRPC transport (`carta.v1.ExtractionService`).
//!
//! Shares [`ServiceState`] with the REST handlers, so both transports feed
//! the same orchestrator and metrics.
//!
//! [`ServiceState`]: crate::service::ServiceState

mod service;

pub use service::ExtractionGrpc;

/// Types generated from `proto/extraction.proto`.
pub mod proto {
    tonic::include_proto!("carta.v1");
}
