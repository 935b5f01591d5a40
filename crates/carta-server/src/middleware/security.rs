//! Request body size limiting.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use tower_http::limit::RequestBodyLimitLayer;

use crate::handler::ErrorKind;

/// Extension trait for `axum::`[`Router`] to apply security middleware.
pub trait RouterSecurityExt<S> {
    /// Rejects request bodies larger than `limit` bytes.
    ///
    /// A declared `Content-Length` above the limit is answered with 413
    /// before any handler runs. A streamed body that overruns the limit
    /// surfaces as a body read error inside the handler.
    fn with_body_limit(self, limit: usize) -> Self;
}

impl<S> RouterSecurityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_body_limit(self, limit: usize) -> Self {
        self.layer(DefaultBodyLimit::max(limit))
            .layer(RequestBodyLimitLayer::new(limit))
            .layer(map_response(payload_too_large))
    }
}

/// Replaces the plain-text 413 of the limit layer with the JSON error body.
async fn payload_too_large(response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ErrorKind::PayloadTooLarge.into_response();
    }

    response
}
