//! Lifecycle states and reports of the RAG orchestrator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator lifecycle state
///
/// `Uninitialized -> Initializing -> Ready`, then `Ready -> Rebuilding ->
/// Ready` for every later initialize. Either transitional state moves to
/// `Failed` on error, and `Failed` can be retried with another initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemState {
    Uninitialized,
    Initializing,
    Ready,
    Rebuilding,
    Failed,
}

impl SystemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Rebuilding => "rebuilding",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which remote documents to fetch before (re)building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "name")]
pub enum FetchPlan {
    /// Use local documents only
    #[default]
    None,
    /// Fetch a single named object
    One(String),
    /// Fetch every PDF in the bucket
    All,
}

/// Options for [`super::RagSystem::initialize_with`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitializeOptions {
    /// Discard the persisted index and build a new one
    pub force_rebuild: bool,
    /// Remote documents to fetch first
    pub fetch: FetchPlan,
}

impl InitializeOptions {
    pub fn rebuild() -> Self {
        Self {
            force_rebuild: true,
            fetch: FetchPlan::None,
        }
    }
}

/// Model identifiers of the active configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub embedding: String,
    pub llm: String,
}

/// Health snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub state: SystemState,
    pub index_loaded: bool,
    /// Documents changed since the active index was built
    pub index_stale: bool,
    pub chunk_count: usize,
    pub document_count: usize,
    pub models: ModelInfo,
}

/// Result of one question in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_plan_json_shape() {
        let options: InitializeOptions =
            serde_json::from_str(r#"{"force_rebuild": true, "fetch": {"mode": "one", "name": "a.pdf"}}"#).unwrap();
        assert!(options.force_rebuild);
        assert_eq!(options.fetch, FetchPlan::One("a.pdf".into()));

        let options: InitializeOptions = serde_json::from_str(r#"{"fetch": {"mode": "all"}}"#).unwrap();
        assert_eq!(options.fetch, FetchPlan::All);

        let options: InitializeOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, InitializeOptions::default());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SystemState::Rebuilding).unwrap(), "\"rebuilding\"");
        assert_eq!(SystemState::Failed.to_string(), "failed");
    }
}
