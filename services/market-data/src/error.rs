//! Feed error type
//!
//! Faults are isolated per subscriber: one bad connection never taints
//! another. The only error surfaced over HTTP is admission rejection.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Broadcast-side failures.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("subscriber limit reached ({0})")]
    SubscriberLimit(u16),

    #[error("subscriber unhealthy: {0}")]
    SubscriberUnhealthy(String),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let status = match self {
            FeedError::SubscriberLimit(_) => StatusCode::SERVICE_UNAVAILABLE,
            FeedError::SubscriberUnhealthy(_) | FeedError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
