//! `/api/functions` — Device function inventory upload and Controller read (§4.5).

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use broker_core::{clock::now_iso, types::{ConnectionInfo, FunctionEntry}, Broker};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client_ip;

#[derive(Debug, Deserialize)]
pub struct UploadBody {
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(rename = "deviceInfo", default)]
    pub device_info: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

/// `POST /api/functions` — Device uploads its current function inventory.
pub async fn upload(
    State(broker): State<Broker>,
    headers: HeaderMap,
    Json(body): Json<UploadBody>,
) -> Json<UploadResponse> {
    broker.liveness.touch(&client_ip(&headers), body.device_info.clone()).await;
    let count = body.functions.len();
    broker.registry.upload(body.functions, body.device_info).await;
    Json(UploadResponse {
        success: true,
        message: format!("registered {count} function(s)"),
        timestamp: now_iso(),
    })
}

#[derive(Debug, Serialize)]
pub struct FunctionsResponse {
    pub functions: Vec<FunctionEntry>,
    #[serde(rename = "deviceInfo", skip_serializing_if = "Option::is_none")]
    pub device_info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "connectionInfo")]
    pub connection_info: ConnectionInfo,
}

/// `GET /api/functions` — Controller reads the current inventory projection.
pub async fn list(State(broker): State<Broker>) -> Json<FunctionsResponse> {
    let view = broker.registry.read().await;
    Json(FunctionsResponse {
        functions: view.functions,
        device_info: view.device_info,
        timestamp: view.last_uploaded_at.map(broker_core::clock::to_iso),
        connection_info: view.connection_info,
    })
}
