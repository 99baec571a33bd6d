//! Command relay (§4.4) — ingress FIFO, dispatch (single + batch), and the
//! result slot map, with per-request wait/poll semantics.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::clock::{new_command_id, now_millis, now_iso};
use crate::error::{BrokerError, Result};
use crate::liveness::LivenessTracker;
use crate::timing::TimingTracker;
use crate::types::{Command, CommandResult, ExecutionMode};

pub const DEFAULT_BATCH_SIZE: i64 = 10;
pub const MIN_BATCH_SIZE: i64 = 1;
pub const MAX_BATCH_SIZE: i64 = 20;

/// Clamps a caller-supplied batch size to `[MIN_BATCH_SIZE, MAX_BATCH_SIZE]`;
/// a missing value falls back to [`DEFAULT_BATCH_SIZE`] (§9 open question).
pub fn clamp_batch_size(raw: Option<i64>) -> usize {
    let n = raw.unwrap_or(DEFAULT_BATCH_SIZE);
    n.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE) as usize
}

/// Outcome of a [`CommandRelay::drain_result`] call.
#[derive(Debug, Clone)]
pub enum DrainOutcome {
    Result(CommandResult),
    Waiting,
    Disconnected,
}

/// Parameters for [`CommandRelay::enqueue`].
#[derive(Debug, Clone, Default)]
pub struct EnqueueRequest {
    pub id: Option<String>,
    pub function: String,
    pub parameters: Vec<Value>,
    pub source_code: Option<String>,
    pub execution_mode: ExecutionMode,
}

/// The ingress FIFO plus the result slot map, guarded independently so that
/// dispatch and result-posting never contend with one another.
pub struct CommandRelay {
    queue: Mutex<VecDeque<Command>>,
    results: Mutex<std::collections::HashMap<String, CommandResult>>,
    active_ids: Mutex<HashSet<String>>,
    timing: TimingTracker,
    liveness: LivenessTracker,
}

impl CommandRelay {
    pub fn new(timing: TimingTracker, liveness: LivenessTracker) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            results: Mutex::new(std::collections::HashMap::new()),
            active_ids: Mutex::new(HashSet::new()),
            timing,
            liveness,
        }
    }

    /// Enqueues a command. Rejects with [`BrokerError::DeviceUnavailable`]
    /// when the Device is not alive, and with [`BrokerError::ClientInput`]
    /// when a caller-supplied id collides with one still outstanding.
    pub async fn enqueue(&self, req: EnqueueRequest) -> Result<String> {
        if req.function.trim().is_empty() {
            return Err(BrokerError::ClientInput("function is required".into()));
        }
        if !self.liveness.is_alive().await {
            return Err(BrokerError::DeviceUnavailable);
        }

        let mut active_ids = self.active_ids.lock().await;
        let id = match req.id {
            Some(id) => {
                if active_ids.contains(&id) {
                    return Err(BrokerError::ClientInput(format!(
                        "command id {id} is already outstanding"
                    )));
                }
                id
            }
            None => new_command_id(),
        };
        active_ids.insert(id.clone());
        drop(active_ids);

        let queued_at = now_millis();
        let command = Command {
            id: id.clone(),
            function: req.function,
            parameters: req.parameters,
            source_code: req.source_code,
            execution_mode: req.execution_mode,
            queued_at,
            timestamp: now_iso(),
        };

        self.queue.lock().await.push_back(command);
        self.timing.track_queued(&id).await;
        Ok(id)
    }

    /// Pops the head of the FIFO, if any, and marks it sent.
    pub async fn dispatch_single(&self) -> Option<Command> {
        let command = self.queue.lock().await.pop_front()?;
        self.timing.track_sent_to_tv(&command.id).await;
        Some(command)
    }

    /// Pops up to `batch_size` commands in one atomic step. Returns the
    /// popped commands in FIFO order plus the count left in the queue.
    pub async fn dispatch_batch(&self, batch_size: usize) -> (Vec<Command>, usize) {
        let mut queue = self.queue.lock().await;
        let n = batch_size.min(queue.len());
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            batch.push(queue.pop_front().expect("checked against queue length"));
        }
        let remaining = queue.len();
        drop(queue);
        for command in &batch {
            self.timing.track_sent_to_tv(&command.id).await;
        }
        (batch, remaining)
    }

    /// Stores the Device's result. The slot write happens before any timing
    /// bookkeeping or cleanup scheduling (§5 "post-before-log").
    pub async fn post_result(&self, result: CommandResult) {
        let command_id = result.command_id.clone();
        self.results.lock().await.insert(command_id.clone(), result);

        tracing::debug!(command_id = %command_id, "result posted");

        let report = self
            .timing
            .track_received_from_tv(&command_id, None)
            .await;
        if report.is_some() {
            self.timing.schedule_cleanup(command_id);
        }
    }

    /// Like [`Self::post_result`] but carries the Device-reported processing
    /// time through to the timing tracker.
    pub async fn post_result_with_timing(
        &self,
        result: CommandResult,
    ) -> Option<crate::timing::ReceivedReport> {
        let command_id = result.command_id.clone();
        let tv_ms = result.tv_processing_time_ms;
        self.results.lock().await.insert(command_id.clone(), result);

        tracing::debug!(command_id = %command_id, "result posted");

        let report = self
            .timing
            .track_received_from_tv(&command_id, tv_ms)
            .await;
        if report.is_some() {
            self.timing.schedule_cleanup(command_id);
        }
        report
    }

    /// Atomic get-and-delete on the result slot, else a liveness-derived
    /// sentinel.
    pub async fn drain_result(&self, command_id: &str) -> DrainOutcome {
        if let Some(result) = self.results.lock().await.remove(command_id) {
            self.active_ids.lock().await.remove(command_id);
            return DrainOutcome::Result(result);
        }
        if !self.liveness.is_alive().await {
            return DrainOutcome::Disconnected;
        }
        DrainOutcome::Waiting
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }
}
