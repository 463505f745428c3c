//! RAG orchestrator and its lifecycle types

mod orchestrator;
mod state;

pub use orchestrator::RagSystem;
pub use state::{FetchPlan, HealthReport, InitializeOptions, ModelInfo, QueryOutcome, SystemState};
