//! Ollama-based providers for embeddings and LLM
//!
//! Wraps the OllamaClient to implement the provider traits.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::generation::ollama::{GenerationParams, OllamaClient};
use crate::policy::RetryPolicy;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Whether a model tag reported by Ollama satisfies the requested name
///
/// An untagged request matches the `:latest` tag.
pub fn model_matches(requested: &str, available: &str) -> bool {
    if requested == available {
        return true;
    }
    !requested.contains(':') && available == format!("{}:latest", requested)
}

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    ready: OnceCell<()>,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self {
            client,
            model,
            ready: OnceCell::new(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                let available = self.client.list_models().await?;
                if available.iter().any(|m| model_matches(&self.model, m)) {
                    tracing::info!("Embedding model {} is available", self.model);
                    Ok(())
                } else {
                    Err(Error::ModelUnavailable(format!(
                        "{} is not pulled (available: {})",
                        self.model,
                        available.join(", ")
                    )))
                }
            })
            .await
            .map(|_| ())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    params: GenerationParams,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String, params: GenerationParams) -> Self {
        Self { client, model, params }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(&self.model, prompt, self.params).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Combined Ollama provider that shares a single client for both embeddings and LLM
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    llm: OllamaLlm,
}

impl OllamaProvider {
    /// Create a new combined Ollama provider
    pub fn new(config: &ModelConfig, retry: RetryPolicy) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(config, retry)?);
        let params = GenerationParams {
            temperature: config.temperature,
            context_window: config.context_window,
        };
        Ok(Self {
            embedder: OllamaEmbedder::from_client(Arc::clone(&client), config.embedding_model.clone()),
            llm: OllamaLlm::from_client(client, config.llm_model.clone(), params),
        })
    }

    /// Split into separate providers
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm) {
        (self.embedder, self.llm)
    }
}
