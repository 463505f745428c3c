//! API routes for the RAG server

pub mod documents;
pub mod query;
pub mod system;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/initialize", post(system::initialize))
        .route("/ask", post(query::ask))
        // Uploads get the larger body limit
        .route(
            "/documents",
            get(documents::list_documents)
                .post(documents::upload_documents)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "pdf-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over PDF documents with retrieval-augmented generation",
        "endpoints": {
            "GET /health": "State, index and model report",
            "GET /ready": "200 once an index is loaded",
            "POST /api/initialize": "Initialize or rebuild the index",
            "POST /api/ask": "Answer a question with sources",
            "GET /api/documents": "List local PDF documents",
            "POST /api/documents": "Upload PDF documents (multipart)"
        }
    }))
}
