//! Application state and dependency injection.

mod service_state;

pub use crate::service::service_state::{ServiceConfig, ServiceState, Uptime};
