//! `/api/remote-command*` and `/api/execute-response*` — the Device<->Controller
//! relay surface (§4, §6).

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use broker_core::{
    relay::{clamp_batch_size, DrainOutcome, EnqueueRequest},
    types::{Command, CommandResult, ExecutionMode},
    Broker,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client_ip;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct EnqueueBody {
    pub id: Option<String>,
    pub function: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
    #[serde(rename = "sourceCode")]
    pub source_code: Option<String>,
    #[serde(rename = "executionMode", default)]
    pub execution_mode: ExecutionMode,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub success: bool,
    #[serde(rename = "commandId")]
    pub command_id: String,
}

/// `POST /api/remote-command` — Controller enqueues a command for the Device.
pub async fn enqueue(
    State(broker): State<Broker>,
    Json(body): Json<EnqueueBody>,
) -> Result<Json<EnqueueResponse>, AppError> {
    let command_id = broker
        .relay
        .enqueue(EnqueueRequest {
            id: body.id,
            function: body.function,
            parameters: body.parameters,
            source_code: body.source_code,
            execution_mode: body.execution_mode,
        })
        .await?;
    Ok(Json(EnqueueResponse {
        success: true,
        command_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct SingleDispatchResponse {
    #[serde(rename = "hasCommand")]
    pub has_command: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
}

/// `GET /api/remote-command` — Device polls for the next queued command.
pub async fn dispatch_single(
    State(broker): State<Broker>,
    headers: HeaderMap,
) -> Json<SingleDispatchResponse> {
    broker.liveness.touch(&client_ip(&headers), None).await;
    let command = broker.relay.dispatch_single().await;
    Json(SingleDispatchResponse {
        has_command: command.is_some(),
        command,
    })
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    #[serde(rename = "batchSize")]
    pub batch_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchDispatchResponse {
    #[serde(rename = "hasCommands")]
    pub has_commands: bool,
    pub commands: Vec<Command>,
    #[serde(rename = "remainingInQueue")]
    pub remaining_in_queue: usize,
}

/// `GET /api/remote-command-batch` — Device polls for up to `batchSize`
/// commands at once. `batchSize` is parsed leniently (§9 Decision): missing
/// or non-numeric falls back to the default rather than rejecting the request.
pub async fn dispatch_batch(
    State(broker): State<Broker>,
    headers: HeaderMap,
    Query(query): Query<BatchQuery>,
) -> Json<BatchDispatchResponse> {
    broker.liveness.touch(&client_ip(&headers), None).await;
    let raw = query.batch_size.and_then(|s| s.parse::<i64>().ok());
    let size = clamp_batch_size(raw);
    let (commands, remaining_in_queue) = broker.relay.dispatch_batch(size).await;
    Json(BatchDispatchResponse {
        has_commands: !commands.is_empty(),
        commands,
        remaining_in_queue,
    })
}

#[derive(Debug, Serialize)]
pub struct PostResultResponse {
    pub success: bool,
}

/// `POST /api/execute-response` — Device reports the outcome of a command it
/// executed. Writing the result into the shared slot map happens before any
/// logging of the event (§4.3 post-before-log).
pub async fn post_result(
    State(broker): State<Broker>,
    headers: HeaderMap,
    Json(result): Json<CommandResult>,
) -> Json<PostResultResponse> {
    broker.liveness.touch(&client_ip(&headers), None).await;
    broker.relay.post_result_with_timing(result).await;
    Json(PostResultResponse { success: true })
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DrainResponse {
    Result(CommandResult),
    Waiting {
        waiting: bool,
    },
    Disconnected {
        success: bool,
        error: String,
    },
}

/// `GET /api/execute-response/:id` — Controller drains the result for a
/// command it previously enqueued. At most one caller observes a given
/// result (§4.4 get-and-delete).
pub async fn drain_result(
    State(broker): State<Broker>,
    Path(command_id): Path<String>,
) -> Json<DrainResponse> {
    let outcome = broker.relay.drain_result(&command_id).await;
    Json(match outcome {
        DrainOutcome::Result(result) => DrainResponse::Result(result),
        DrainOutcome::Waiting => DrainResponse::Waiting { waiting: true },
        DrainOutcome::Disconnected => DrainResponse::Disconnected {
            success: false,
            error: "TV_DISCONNECTED".to_string(),
        },
    })
}
