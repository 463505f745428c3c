//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote object, persisted index or local file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authorization failure against remote storage
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Network or service fault that may succeed on retry
    #[error("Transient error: {0}")]
    Transient(String),

    /// Document could not be parsed
    #[error("Failed to process '{filename}': {message}")]
    Processing { filename: String, message: String },

    /// Index build was handed no chunks
    #[error("Cannot build an index from empty input")]
    EmptyInput,

    /// No PDF documents in the local document directory
    #[error("No PDF documents found in {0}")]
    NoDocuments(String),

    /// Splitting the local documents produced no text chunks
    #[error("No text chunks generated from {0} document(s)")]
    NoChunks(usize),

    /// Persisted index could not be written or read back consistently
    #[error("Index storage error: {0}")]
    Storage(String),

    /// Embedding model could not be loaded
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Caller contract violation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding generation failed for a single request
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Language model call failed
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Query issued before a successful initialize
    #[error("RAG system is not ready (state: {0})")]
    NotReady(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a processing error
    pub fn processing(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processing {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Only transient faults are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            Error::Transient(_) => (StatusCode::BAD_GATEWAY, "transient_error"),
            Error::Processing { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "processing_error"),
            Error::EmptyInput => (StatusCode::UNPROCESSABLE_ENTITY, "empty_input"),
            Error::NoDocuments(_) => (StatusCode::UNPROCESSABLE_ENTITY, "no_documents"),
            Error::NoChunks(_) => (StatusCode::UNPROCESSABLE_ENTITY, "no_chunks"),
            Error::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            Error::ModelUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            Error::Generation(_) => (StatusCode::BAD_GATEWAY, "generation_error"),
            Error::NotReady(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
