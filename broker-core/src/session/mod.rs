//! Session store (§4.6) — one JSON file per session, run-aware merge,
//! list/load/resume/delete.

pub mod merge;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::clock::now_iso;
use crate::error::{BrokerError, Result};
use crate::types::{FileRecord, Session, SessionMetadata, SessionPayloadData, SaveAction};

use self::merge::{create_session, merge_session, sanitize_session_id, synthesize_session_id, SaveOutcome};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub session_id: String,
    pub total_files: u64,
    pub new_files: u64,
    pub run_id: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub name: String,
    pub status: String,
    pub total_files: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub total_runs: u32,
    pub last_modified: String,
    pub size: u64,
    pub can_resume: bool,
    pub can_browse: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub session_id: String,
    pub metadata: SessionMetadata,
    pub data: SessionPayloadData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    pub session_id: String,
    pub session: serde_json::Value,
    pub results: Vec<FileRecord>,
    pub variables: serde_json::Value,
    pub deferred_paths: Vec<serde_json::Value>,
    pub next_run_id: u32,
}

/// Durable, file-per-session store. Directory creation is idempotent;
/// concurrent merge-saves on the *same* session are serialized through a
/// per-session lock keyed by `sessionId` (§5).
pub struct SessionStore {
    base_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}.json"))
    }

    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| BrokerError::Internal(e.into()))
    }

    /// Best-effort read for the merge path: a missing file means "proceed as
    /// create"; a parse failure is likewise treated as absent (§7 — re-raised
    /// only by `list`/`load`, never silently swallowed there).
    async fn read_session_lenient(&self, path: &Path) -> Result<Option<Session>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice::<Session>(&bytes).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BrokerError::Internal(e.into())),
        }
    }

    async fn read_session_strict(&self, path: &Path) -> Result<Session> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| BrokerError::Internal(e.into()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BrokerError::NotFound("session not found".into()))
            }
            Err(e) => Err(BrokerError::Internal(e.into())),
        }
    }

    pub async fn save(
        &self,
        session_id: Option<String>,
        action: SaveAction,
        run_id: Option<u32>,
        payload: SessionPayloadData,
    ) -> Result<SaveResponse> {
        self.ensure_dir().await?;
        let session_id = match session_id {
            Some(id) if !id.trim().is_empty() => sanitize_session_id(&id),
            _ => synthesize_session_id(&chrono::Utc::now()),
        };

        let session_lock = self.lock_for(&session_id).await;
        let _guard = session_lock.lock().await;

        let path = self.path_for(&session_id);
        let existing = if action == SaveAction::Merge {
            self.read_session_lenient(&path).await?
        } else {
            None
        };

        let now = now_iso();
        let outcome: SaveOutcome = match existing {
            Some(session) => merge_session(session, run_id, payload, now),
            None => create_session(session_id.clone(), run_id, payload, now),
        };

        let bytes =
            serde_json::to_vec(&outcome.session).map_err(|e| BrokerError::Internal(e.into()))?;
        let size = bytes.len() as u64;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| BrokerError::Internal(e.into()))?;

        Ok(SaveResponse {
            session_id,
            total_files: outcome.total_files,
            new_files: outcome.new_files,
            run_id: outcome.run_id,
            size,
        })
    }

    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        self.ensure_dir().await?;
        let mut entries = tokio::fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| BrokerError::Internal(e.into()))?;
        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BrokerError::Internal(e.into()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| BrokerError::Internal(e.into()))?;
            let session: Session =
                serde_json::from_slice(&bytes).map_err(|e| BrokerError::Internal(e.into()))?;
            let file_meta = entry
                .metadata()
                .await
                .map_err(|e| BrokerError::Internal(e.into()))?;
            let status = session
                .data
                .session
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            let can_resume = matches!(status.as_str(), "paused" | "running");
            summaries.push(SessionSummary {
                session_id: session.session_id.clone(),
                name: session.session_id,
                status,
                total_files: session.metadata.total_files,
                success_count: session.metadata.success_count,
                failed_count: session.metadata.failed_count,
                total_runs: session.metadata.total_runs,
                last_modified: session.last_modified,
                size: file_meta.len(),
                can_resume,
                can_browse: true,
            });
        }
        summaries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(summaries)
    }

    pub async fn load(&self, session_id: &str) -> Result<LoadResponse> {
        let session_id = sanitize_session_id(session_id);
        let session = self.read_session_strict(&self.path_for(&session_id)).await?;
        Ok(LoadResponse {
            session_id: session.session_id,
            metadata: session.metadata,
            data: session.data,
        })
    }

    pub async fn resume(&self, session_id: &str) -> Result<ResumeResponse> {
        let session_id = sanitize_session_id(session_id);
        let session = self.read_session_strict(&self.path_for(&session_id)).await?;
        let next_run_id = session.runs.len() as u32 + 1;
        Ok(ResumeResponse {
            session_id: session.session_id,
            session: session.data.session,
            results: session.data.results,
            variables: session.data.variables,
            deferred_paths: session.data.deferred_paths,
            next_run_id,
        })
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let session_id = sanitize_session_id(session_id);
        match tokio::fs::remove_file(self.path_for(&session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BrokerError::NotFound(
                format!("session {session_id} not found"),
            )),
            Err(e) => Err(BrokerError::Internal(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord as FR;

    fn file(path: &str, status: &str) -> FR {
        FR {
            path: path.to_string(),
            status: status.to_string(),
            size: Some(1),
            content: Some("x".into()),
            is_binary: Some(false),
            timestamp: "t".into(),
            extracted_paths: vec![],
            generated_paths: None,
            ignored_paths: None,
            variable_references: vec![],
            discovery_method: Some("scan".into()),
            discovered_from: Some("root".into()),
            is_placeholder: Some(false),
            scan_history: vec![],
            debug_log: None,
        }
    }

    fn payload(files: Vec<FR>) -> SessionPayloadData {
        SessionPayloadData {
            results: files,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let resp = store
            .save(
                Some("my session!".into()),
                SaveAction::Create,
                None,
                payload(vec![file("/a", "success")]),
            )
            .await
            .unwrap();
        assert_eq!(resp.session_id, "my_session_");
        assert_eq!(resp.total_files, 1);

        let loaded = store.load("my session!").await.unwrap();
        assert_eq!(loaded.session_id, "my_session_");
        assert_eq!(loaded.data.results.len(), 1);
    }

    #[tokio::test]
    async fn merge_onto_missing_file_behaves_as_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let resp = store
            .save(
                Some("s1".into()),
                SaveAction::Merge,
                None,
                payload(vec![file("/a", "success")]),
            )
            .await
            .unwrap();
        assert_eq!(resp.total_files, 1);
        assert_eq!(resp.new_files, 1);
    }

    #[tokio::test]
    async fn list_is_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save(Some("s1".into()), SaveAction::Create, None, payload(vec![file("/a", "success")]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .save(Some("s2".into()), SaveAction::Create, None, payload(vec![file("/b", "success")]))
            .await
            .unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].session_id, "s2");
    }

    #[tokio::test]
    async fn resume_reports_next_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save(Some("s1".into()), SaveAction::Create, Some(1), payload(vec![file("/a", "success")]))
            .await
            .unwrap();
        store
            .save(Some("s1".into()), SaveAction::Merge, Some(2), payload(vec![file("/b", "success")]))
            .await
            .unwrap();

        let resume = store.resume("s1").await.unwrap();
        assert_eq!(resume.next_run_id, 3);
        assert_eq!(resume.results.len(), 2);
    }

    #[tokio::test]
    async fn delete_missing_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let err = store.delete("nope").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save(Some("s1".into()), SaveAction::Create, None, payload(vec![file("/a", "success")]))
            .await
            .unwrap();
        store.delete("s1").await.unwrap();
        assert!(matches!(
            store.load("s1").await.unwrap_err(),
            BrokerError::NotFound(_)
        ));
    }
}
