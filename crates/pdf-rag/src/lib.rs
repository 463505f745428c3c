//! pdf-rag: question answering over PDF documents
//!
//! Documents are fetched from object storage or uploaded, split into
//! overlapping chunks, embedded with Ollama and persisted as a vector index.
//! Questions are answered by retrieving the closest chunks and prompting a
//! local LLM with them. [`system::RagSystem`] owns the index lifecycle.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod policy;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod system;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use system::{HealthReport, InitializeOptions, RagSystem, SystemState};
pub use types::{Answer, Chunk, SourceRef};
