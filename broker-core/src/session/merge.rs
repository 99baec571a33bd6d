//! Pure merge logic for session saves (§3 merge invariants, §4.6).

use serde_json::Value;

use crate::types::{FileRecord, RunEntry, ScanHistoryEntry, Session, SessionMetadata, SessionPayloadData};

/// Sanitizes a caller-supplied session id to `[A-Za-z0-9_-]+` (§4.6, testable
/// property 8), replacing every other character with `_`.
pub fn sanitize_session_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Synthesizes a session id when the caller omits one:
/// `scan_<UTC-iso-without-millis>` with `:` and `.` replaced by `-`.
pub fn synthesize_session_id(now: &chrono::DateTime<chrono::Utc>) -> String {
    let iso = now.format("%Y-%m-%dT%H:%M:%S").to_string();
    format!("scan_{}", iso.replace(':', "-").replace('.', "-"))
}

fn extend_unique(base: &mut Vec<String>, incoming: &[String]) {
    for item in incoming {
        if !base.contains(item) {
            base.push(item.clone());
        }
    }
}

fn extend_unique_opt(base: &mut Option<Vec<String>>, incoming: &Option<Vec<String>>) {
    if let Some(incoming) = incoming {
        let base_vec = base.get_or_insert_with(Vec::new);
        extend_unique(base_vec, incoming);
    }
}

/// Merges one incoming [`FileRecord`] into the record already on file for
/// the same path, applying every invariant in §3.
fn merge_file_record(existing: &FileRecord, incoming: &FileRecord, run_id: u32) -> FileRecord {
    let is_binary = existing.is_binary.unwrap_or(false) || incoming.is_binary.unwrap_or(false);
    let status = if incoming.status == "success" {
        "success".to_string()
    } else {
        existing.status.clone()
    };

    let mut scan_history = existing.scan_history.clone();
    match scan_history.last_mut() {
        Some(last) if last.run_id == run_id => {
            if last.status != status {
                last.status = status.clone();
                last.timestamp = incoming.timestamp.clone();
            }
        }
        _ => scan_history.push(ScanHistoryEntry {
            run_id,
            status: status.clone(),
            timestamp: incoming.timestamp.clone(),
        }),
    }

    let mut extracted_paths = existing.extracted_paths.clone();
    extend_unique(&mut extracted_paths, &incoming.extracted_paths);

    let mut variable_references = existing.variable_references.clone();
    extend_unique(&mut variable_references, &incoming.variable_references);

    let mut generated_paths = existing.generated_paths.clone();
    extend_unique_opt(&mut generated_paths, &incoming.generated_paths);

    let mut ignored_paths = existing.ignored_paths.clone();
    extend_unique_opt(&mut ignored_paths, &incoming.ignored_paths);

    let debug_log = match (&existing.debug_log, &incoming.debug_log) {
        (Some(a), Some(b)) => {
            let mut merged = a.clone();
            merged.extend(b.iter().cloned());
            Some(merged)
        }
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    };

    FileRecord {
        path: existing.path.clone(),
        status,
        size: incoming.size.or(existing.size),
        content: if is_binary {
            None
        } else {
            incoming.content.clone().or_else(|| existing.content.clone())
        },
        is_binary: Some(is_binary),
        timestamp: incoming.timestamp.clone(),
        extracted_paths,
        generated_paths,
        ignored_paths,
        variable_references,
        discovery_method: existing.discovery_method.clone().or_else(|| incoming.discovery_method.clone()),
        discovered_from: existing.discovered_from.clone().or_else(|| incoming.discovered_from.clone()),
        is_placeholder: existing.is_placeholder.or(incoming.is_placeholder),
        scan_history,
        debug_log,
    }
}

/// Path-keyed union of the file records already on disk with a fresh batch,
/// preserving the existing order and appending newly-seen paths at the end.
fn merge_file_records(existing: Vec<FileRecord>, incoming: Vec<FileRecord>, run_id: u32) -> Vec<FileRecord> {
    let mut merged: Vec<FileRecord> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index = std::collections::HashMap::new();
    for record in existing {
        index.insert(record.path.clone(), merged.len());
        merged.push(record);
    }
    for record in incoming {
        if let Some(&pos) = index.get(&record.path) {
            merged[pos] = merge_file_record(&merged[pos], &record, run_id);
        } else {
            let mut first = record.clone();
            first.is_binary = Some(record.is_binary.unwrap_or(false));
            if first.is_binary == Some(true) {
                first.content = None;
            }
            first.scan_history = vec![ScanHistoryEntry {
                run_id,
                status: first.status.clone(),
                timestamp: first.timestamp.clone(),
            }];
            index.insert(first.path.clone(), merged.len());
            merged.push(first);
        }
    }
    merged
}

fn recompute_metadata(results: &[FileRecord], total_runs: u32) -> SessionMetadata {
    let mut metadata = SessionMetadata {
        total_runs,
        ..Default::default()
    };
    metadata.total_files = results.len() as u64;
    for record in results {
        match record.status.as_str() {
            "success" => metadata.success_count += 1,
            "failed" => metadata.failed_count += 1,
            _ => {}
        }
        if record.is_binary == Some(true) {
            metadata.binary_count += 1;
        } else {
            metadata.text_count += 1;
        }
    }
    metadata
}

/// Pulls `startTime`/`endTime` (ms since epoch) out of the free-form
/// `data.session` value and returns their difference, or `0` if either is
/// absent or not a number (§4.6 "duration is computed from session.startTime
/// / session.endTime when both present, else 0").
fn compute_duration(session: &Value) -> i64 {
    let start = session.get("startTime").and_then(Value::as_i64);
    let end = session.get("endTime").and_then(Value::as_i64);
    match (start, end) {
        (Some(s), Some(e)) => (e - s).max(0),
        _ => 0,
    }
}

fn run_status(session: &Value) -> String {
    session
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("completed")
        .to_string()
}

/// Result of a save: whether it landed as a create or a merge, and the
/// counts the HTTP response reports back.
pub struct SaveOutcome {
    pub session: Session,
    pub total_files: u64,
    pub new_files: u64,
    pub run_id: u32,
}

/// Builds a brand-new session from a first save.
pub fn create_session(
    session_id: String,
    run_id: Option<u32>,
    payload: SessionPayloadData,
    now_iso: String,
) -> SaveOutcome {
    let run_id = run_id.unwrap_or(1);
    let files_scanned = payload.results.len() as u64;
    let duration = compute_duration(&payload.session);
    let status = run_status(&payload.session);

    let results = merge_file_records(Vec::new(), payload.results, run_id);
    let metadata = recompute_metadata(&results, 1);
    let total_files = metadata.total_files;

    let session = Session {
        session_id,
        version: "1.0.0".to_string(),
        created: now_iso.clone(),
        last_modified: now_iso.clone(),
        metadata,
        runs: vec![RunEntry {
            run_id,
            timestamp: now_iso,
            files_scanned,
            duration,
            status,
        }],
        data: SessionPayloadData {
            results,
            session: payload.session,
            variables: payload.variables,
            deferred_paths: payload.deferred_paths,
        },
    };

    SaveOutcome {
        total_files,
        new_files: total_files,
        run_id,
        session,
    }
}

/// Merges an incoming save into an existing session (§4.6).
pub fn merge_session(mut existing: Session, run_id: Option<u32>, payload: SessionPayloadData, now_iso: String) -> SaveOutcome {
    let pre_merge_count = existing.data.results.len();
    let current_run_id = run_id.unwrap_or(existing.runs.len() as u32 + 1);
    let files_scanned = payload.results.len() as u64;
    let duration = compute_duration(&payload.session);
    let status = run_status(&payload.session);

    let merged_results = merge_file_records(existing.data.results, payload.results, current_run_id);
    let new_files = merged_results.len().saturating_sub(pre_merge_count) as u64;

    match existing.runs.iter_mut().find(|r| r.run_id == current_run_id) {
        Some(run) => {
            run.timestamp = now_iso.clone();
            run.files_scanned = files_scanned;
            run.duration = duration;
            run.status = status;
        }
        None => existing.runs.push(RunEntry {
            run_id: current_run_id,
            timestamp: now_iso.clone(),
            files_scanned,
            duration,
            status,
        }),
    }

    let metadata = recompute_metadata(&merged_results, existing.runs.len() as u32);
    let total_files = metadata.total_files;

    existing.metadata = metadata;
    existing.last_modified = now_iso;
    existing.data.results = merged_results;
    existing.data.session = payload.session;
    existing.data.variables = payload.variables;
    existing.data.deferred_paths = payload.deferred_paths;

    SaveOutcome {
        total_files,
        new_files,
        run_id: current_run_id,
        session: existing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;

    fn file(path: &str, status: &str, is_binary: bool, content: Option<&str>) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            status: status.to_string(),
            size: Some(10),
            content: content.map(|c| c.to_string()),
            is_binary: Some(is_binary),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
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

    #[test]
    fn sanitizes_disallowed_characters() {
        assert_eq!(sanitize_session_id("a b/c.d"), "a_b_c_d");
        assert_eq!(sanitize_session_id("valid-Id_123"), "valid-Id_123");
    }

    #[test]
    fn create_then_merge_matches_scenario_s4() {
        let payload1 = SessionPayloadData {
            results: vec![file("/a", "success", false, Some("A"))],
            ..Default::default()
        };
        let outcome1 = create_session("s1".into(), Some(1), payload1, "t1".into());
        assert_eq!(outcome1.total_files, 1);
        assert_eq!(outcome1.new_files, 1);

        let payload2 = SessionPayloadData {
            results: vec![
                file("/a", "failed", false, None),
                file("/b", "success", true, Some("xx")),
            ],
            ..Default::default()
        };
        let outcome2 = merge_session(outcome1.session, Some(2), payload2, "t2".into());

        let results = &outcome2.session.data.results;
        assert_eq!(results[0].path, "/a");
        assert_eq!(results[0].status, "success"); // sticky success
        assert_eq!(results[0].scan_history.len(), 2);
        assert_eq!(results[1].path, "/b");
        assert_eq!(results[1].is_binary, Some(true));
        assert!(results[1].content.is_none());

        assert_eq!(outcome2.session.metadata.total_runs, 2);
        assert_eq!(outcome2.session.metadata.total_files, 2);
        assert_eq!(outcome2.session.metadata.binary_count, 1);
        assert_eq!(outcome2.new_files, 1);
    }

    #[test]
    fn same_run_id_merge_is_idempotent() {
        let payload1 = SessionPayloadData {
            results: vec![file("/a", "success", false, Some("A"))],
            ..Default::default()
        };
        let outcome1 = create_session("s1".into(), Some(1), payload1.clone(), "t1".into());
        let before_runs = outcome1.session.runs.len();
        let before_history_len = outcome1.session.data.results[0].scan_history.len();

        let outcome2 = merge_session(outcome1.session, Some(1), payload1, "t2".into());
        assert_eq!(outcome2.session.runs.len(), before_runs);
        assert_eq!(outcome2.session.data.results[0].scan_history.len(), before_history_len);
        assert_eq!(outcome2.session.data.results.len(), 1);
    }

    #[test]
    fn binary_on_either_side_strips_content_permanently() {
        let payload1 = SessionPayloadData {
            results: vec![file("/a", "success", true, Some("bin"))],
            ..Default::default()
        };
        let outcome1 = create_session("s1".into(), Some(1), payload1, "t1".into());
        assert!(outcome1.session.data.results[0].content.is_none());

        let payload2 = SessionPayloadData {
            results: vec![file("/a", "success", false, Some("text-now"))],
            ..Default::default()
        };
        let outcome2 = merge_session(outcome1.session, Some(2), payload2, "t2".into());
        assert!(outcome2.session.data.results[0].content.is_none());
    }
}
