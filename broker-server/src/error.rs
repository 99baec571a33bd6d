//! Error handling for the axum server.
//! Maps `BrokerError` to HTTP status codes and JSON error bodies.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use broker_core::error::BrokerError;
use serde_json::json;

/// Wrapper to convert `BrokerError` into an axum response.
pub struct AppError(BrokerError);

impl From<BrokerError> for AppError {
    fn from(e: BrokerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // The Device-unavailable case carries the wire-contract sentinel the
        // Controller branches on, not the human-readable `Display` message.
        let message = match &self.0 {
            BrokerError::DeviceUnavailable => "TV_NOT_CONNECTED".to_string(),
            other => other.to_string(),
        };
        let body = json!({
            "error": message,
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
