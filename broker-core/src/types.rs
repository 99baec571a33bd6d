//! Shared data model (§3 of the specification).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel `function` name denoting an arbitrary-code command.
/// `parameters[0]` carries the source when this sentinel is used.
pub const CUSTOM_CODE_SENTINEL: &str = "__CUSTOM_CODE__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Direct,
    Custom,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Direct
    }
}

/// A single function invocation (or custom-code fragment) bound for the Device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    pub function: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Broker-side enqueue instant (ms since epoch); not part of the wire
    /// contract the Controller supplies, but carried onward to the Device.
    pub queued_at: i64,
    /// ISO-8601 rendering of `queued_at`, for transport.
    pub timestamp: String,
}

impl Command {
    pub fn is_custom_code(&self) -> bool {
        self.function == CUSTOM_CODE_SENTINEL
    }
}

/// The Device's response to a dispatched [`Command`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tv_processing_time_ms: Option<i64>,
}

/// Device connection state (§4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<Value>,
}

/// One entry in a function inventory upload (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEntry {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

// ── Session store types (§3, §4.6) ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanHistoryEntry {
    pub run_id: u32,
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_binary: Option<bool>,
    pub timestamp: String,
    #[serde(default)]
    pub extracted_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_paths: Option<Vec<String>>,
    #[serde(default)]
    pub variable_references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_placeholder: Option<bool>,
    #[serde(default)]
    pub scan_history: Vec<ScanHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEntry {
    pub run_id: u32,
    pub timestamp: String,
    #[serde(default)]
    pub files_scanned: u64,
    #[serde(default)]
    pub duration: i64,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub text_count: u64,
    #[serde(default)]
    pub binary_count: u64,
    #[serde(default)]
    pub total_runs: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayloadData {
    #[serde(default)]
    pub results: Vec<FileRecord>,
    #[serde(default)]
    pub session: Value,
    #[serde(default)]
    pub variables: Value,
    #[serde(default)]
    pub deferred_paths: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub version: String,
    pub created: String,
    pub last_modified: String,
    #[serde(default)]
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub runs: Vec<RunEntry>,
    pub data: SessionPayloadData,
}

/// Incoming payload for `POST /api/scan/session/save`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSavePayload {
    #[serde(default)]
    pub session_id: Option<String>,
    pub action: SaveAction,
    #[serde(default)]
    pub run_id: Option<u32>,
    pub data: SessionPayloadData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Create,
    Merge,
}

pub type DeviceInfo = HashMap<String, Value>;
