//! `/api/scan/session/*` — durable session storage (§4.6).

use axum::{
    extract::{Path, State},
    Json,
};
use broker_core::{
    session::{LoadResponse, ResumeResponse, SaveResponse, SessionSummary},
    types::SessionSavePayload,
    Broker,
};

use crate::error::AppError;

/// `POST /api/scan/session/save`.
pub async fn save(
    State(broker): State<Broker>,
    Json(body): Json<SessionSavePayload>,
) -> Result<Json<SaveResponse>, AppError> {
    let response = broker
        .sessions
        .save(body.session_id, body.action, body.run_id, body.data)
        .await?;
    Ok(Json(response))
}

/// `GET /api/scan/sessions`.
pub async fn list(State(broker): State<Broker>) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let summaries = broker.sessions.list().await?;
    Ok(Json(summaries))
}

/// `GET /api/scan/session/load/:id`.
pub async fn load(
    State(broker): State<Broker>,
    Path(session_id): Path<String>,
) -> Result<Json<LoadResponse>, AppError> {
    let response = broker.sessions.load(&session_id).await?;
    Ok(Json(response))
}

/// `GET /api/scan/session/resume/:id`.
pub async fn resume(
    State(broker): State<Broker>,
    Path(session_id): Path<String>,
) -> Result<Json<ResumeResponse>, AppError> {
    let response = broker.sessions.resume(&session_id).await?;
    Ok(Json(response))
}

#[derive(Debug, serde::Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// `DELETE /api/scan/session/delete/:id`.
pub async fn delete(
    State(broker): State<Broker>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    broker.sessions.delete(&session_id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
