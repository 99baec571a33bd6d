//! `GET /api/health` — operator liveness probe (§10.6 supplemented endpoint).

use axum::{extract::State, Json};
use broker_core::{types::ConnectionInfo, Broker};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(rename = "connectionInfo")]
    pub connection_info: ConnectionInfo,
}

pub async fn health(State(broker): State<Broker>) -> Json<HealthResponse> {
    let connection_info = broker.liveness.get_status().await;
    Json(HealthResponse {
        status: "ok",
        connection_info,
    })
}
