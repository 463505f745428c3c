//! Application state for the RAG server

use std::sync::Arc;

use crate::system::RagSystem;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    system: Arc<RagSystem>,
}

impl AppState {
    /// Wrap an orchestrator handle
    pub fn new(system: Arc<RagSystem>) -> Self {
        Self { system }
    }

    /// The RAG orchestrator
    pub fn system(&self) -> &RagSystem {
        &self.system
    }

    /// Check if the server can answer questions
    pub fn is_ready(&self) -> bool {
        self.system.health().index_loaded
    }
}
