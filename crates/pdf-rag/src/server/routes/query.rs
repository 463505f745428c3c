//! Question answering endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::SourceRef;

/// Request body for `POST /api/ask`
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Response body for `POST /api/ask`
#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub processing_time_ms: u64,
}

/// POST /api/ask - Answer a question from the indexed documents
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();
    let answer = state.system().answer(&request.question).await?;

    Ok(Json(AskResponse {
        question: request.question,
        answer: answer.text,
        sources: answer.sources,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
