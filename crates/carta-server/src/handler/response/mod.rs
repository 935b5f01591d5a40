//! Response bodies.

mod error_response;
mod extraction;
mod health;

pub use error_response::ErrorResponse;
pub use extraction::{ExtractionResponse, ResponseMeta, status_for};
pub use health::{HealthMetrics, HealthResponse};
