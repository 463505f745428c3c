//! Lifecycle endpoints

use axum::{body::Bytes, extract::State, Json};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::system::{HealthReport, InitializeOptions};

/// POST /api/initialize - Initialize or rebuild the index
///
/// An empty body initializes without a rebuild or fetch. Any other body must
/// be a valid `InitializeOptions` document.
pub async fn initialize(State(state): State<AppState>, body: Bytes) -> Result<Json<HealthReport>> {
    let options = parse_options(&body)?;
    state.system().initialize_with(options).await?;
    Ok(Json(state.system().health()))
}

fn parse_options(body: &[u8]) -> Result<InitializeOptions> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(InitializeOptions::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Invalid initialize options: {}", e)))
}

/// GET /health - Health snapshot
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.system().health())
}
