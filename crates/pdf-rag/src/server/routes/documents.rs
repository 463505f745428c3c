//! Local document listing and upload endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Response body for `GET /api/documents`
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<String>,
    pub total: usize,
}

/// A file that could not be stored
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadError {
    pub filename: String,
    pub error: String,
}

/// Response body for `POST /api/documents`
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub stored: Vec<String>,
    pub errors: Vec<UploadError>,
    /// Whether a rebuild is needed to search the new documents
    pub index_stale: bool,
}

/// GET /api/documents - List local PDF documents
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentList>> {
    let documents = state.system().list_local_documents().await?;
    Ok(Json(DocumentList {
        total: documents.len(),
        documents,
    }))
}

/// POST /api/documents - Upload PDF files (multipart)
///
/// Each file part is stored independently; rejected files are reported in
/// `errors` without failing the request.
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut stored = Vec::new();
    let mut errors = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read {}: {}", filename, e)))?;

        match state.system().upload_document(&filename, &data).await {
            Ok(_) => stored.push(filename),
            Err(e) => {
                tracing::warn!("Rejected upload {}: {}", filename, e);
                errors.push(UploadError {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    if stored.is_empty() && errors.is_empty() {
        return Err(Error::InvalidInput("No files in upload".to_string()));
    }

    Ok(Json(UploadResponse {
        stored,
        errors,
        index_stale: state.system().health().index_stale,
    }))
}
