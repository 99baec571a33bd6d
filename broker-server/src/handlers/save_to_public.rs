//! `POST /api/save-to-public` — Controller writes generated files to a
//! public directory the Device's web surface can serve from directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{extract::State, Json};
use broker_core::error::BrokerError;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SaveFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveToPublicBody {
    pub files: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SaveToPublicResponse {
    pub success: bool,
    pub saved: Vec<String>,
    pub location: String,
    pub message: String,
}

/// Rejects any filename that would escape `public_dir` once joined, so a
/// Controller-supplied name can never write outside the intended directory.
fn safe_join(base: &Path, filename: &str) -> Option<PathBuf> {
    let candidate = Path::new(filename);
    if candidate.components().any(|c| {
        matches!(
            c,
            std::path::Component::ParentDir | std::path::Component::RootDir | std::path::Component::Prefix(_)
        )
    }) {
        return None;
    }
    Some(base.join(candidate))
}

pub async fn save_to_public(
    State(public_dir): State<Arc<PathBuf>>,
    Json(body): Json<SaveToPublicBody>,
) -> Result<Json<SaveToPublicResponse>, AppError> {
    let files: Vec<SaveFile> = match body.files {
        Some(serde_json::Value::Array(items)) => {
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                let file: SaveFile = serde_json::from_value(item).map_err(|_| {
                    BrokerError::ClientInput(
                        "each file entry requires filename and content".to_string(),
                    )
                })?;
                parsed.push(file);
            }
            parsed
        }
        _ => {
            return Err(BrokerError::ClientInput("files must be a non-empty array".to_string()).into())
        }
    };

    tokio::fs::create_dir_all(public_dir.as_path())
        .await
        .map_err(|e| BrokerError::Internal(e.into()))?;

    let mut saved = Vec::with_capacity(files.len());
    for file in &files {
        let path = safe_join(public_dir.as_path(), &file.filename).ok_or_else(|| {
            BrokerError::ClientInput(format!("invalid filename: {}", file.filename))
        })?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BrokerError::Internal(e.into()))?;
        }
        tokio::fs::write(&path, &file.content)
            .await
            .map_err(|e| BrokerError::Internal(e.into()))?;
        saved.push(file.filename.clone());
    }

    Ok(Json(SaveToPublicResponse {
        success: true,
        location: public_dir.display().to_string(),
        message: format!("saved {} file(s)", saved.len()),
        saved,
    }))
}
