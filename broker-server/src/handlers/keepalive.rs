//! `/api/keepalive` — Device heartbeat (§4.3).

use axum::{extract::State, http::HeaderMap, Json};
use broker_core::{clock::now_iso, Broker};
use serde::Serialize;

use super::client_ip;

#[derive(Debug, Serialize)]
pub struct KeepaliveResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

/// `POST /api/keepalive` — Device touches its own liveness record.
pub async fn keepalive(State(broker): State<Broker>, headers: HeaderMap) -> Json<KeepaliveResponse> {
    broker.liveness.touch(&client_ip(&headers), None).await;
    Json(KeepaliveResponse {
        success: true,
        message: "alive".to_string(),
        timestamp: now_iso(),
    })
}
