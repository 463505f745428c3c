//! Provider abstractions for embeddings, LLM, and document storage
//!
//! Trait-based seams so the orchestrator can run against Ollama and real
//! object storage in production and against fakes in tests.

pub mod embedding;
pub mod http_store;
pub mod llm;
pub mod local;
pub mod object_store;
pub mod ollama;
pub mod sigv4;

#[cfg(feature = "gcp")]
pub mod gcp;

pub use embedding::EmbeddingProvider;
pub use http_store::HttpObjectStore;
pub use llm::LlmProvider;
pub use local::LocalDocumentStore;
pub use object_store::ObjectStore;
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use sigv4::AwsCredentials;
