//! Ollama HTTP client for embeddings and answer generation

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::policy::{with_retry, RetryPolicy};

/// Ollama API client
///
/// Embedding requests are retried on transient faults; generation requests
/// are sent exactly once.
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Retry policy for embedding calls
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Generation parameters forwarded to Ollama
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Context window size (tokens)
    pub context_window: usize,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &ModelConfig, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Names of the locally available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("Ollama unreachable at {}: {}", self.base_url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ModelUnavailable(format!(
                "Model listing failed: HTTP {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("Failed to parse model listing: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Generate an embedding with retry on transient failures
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let url = url.as_str();
        let client = &self.client;

        with_retry(&self.retry, "embedding request", move || async move {
            let request = EmbedRequest { model, prompt: text };

            let response = client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::Transient(format!("Embedding request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    Error::Transient(format!("Embedding failed: HTTP {} - {}", status, body))
                } else {
                    Error::embedding(format!("Embedding failed: HTTP {} - {}", status, body))
                });
            }

            let embed_response: EmbedResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

            if embed_response.embedding.is_empty() {
                return Err(Error::embedding(format!("Model {} returned an empty embedding", model)));
            }

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate a completion for a rendered prompt (single attempt)
    pub async fn generate(&self, model: &str, prompt: &str, params: GenerationParams) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        tracing::info!("Generating answer with model: {}", model);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                num_ctx: params.context_window,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Failed to parse generation response: {}", e)))?;

        Ok(generate_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OllamaClient {
        let config = ModelConfig {
            ollama_url: server.uri(),
            ..ModelConfig::default()
        };
        OllamaClient::new(&config, RetryPolicy::immediate(3)).unwrap()
    }

    const PARAMS: GenerationParams = GenerationParams {
        temperature: 0.1,
        context_window: 2048,
    };

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "all-minilm:latest"}, {"name": "qwen2.5:3b-instruct"}]
            })))
            .mount(&server)
            .await;

        let models = client(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["all-minilm:latest", "qwen2.5:3b-instruct"]);
    }

    #[tokio::test]
    async fn test_embed_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let result = client(&server).embed("all-minilm", "hello").await;
        assert!(matches!(result, Err(Error::Transient(_))));
    }

    #[tokio::test]
    async fn test_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(json!({"model": "all-minilm", "prompt": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.5, 0.25]})))
            .mount(&server)
            .await;

        let v = client(&server).embed("all-minilm", "hello").await.unwrap();
        assert_eq!(v, vec![0.5, 0.25]);
    }

    #[tokio::test]
    async fn test_generate_passes_context_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:3b-instruct",
                "stream": false,
                "options": {"num_ctx": 2048}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "42", "done": true})))
            .mount(&server)
            .await;

        let answer = client(&server)
            .generate("qwen2.5:3b-instruct", "prompt", PARAMS)
            .await
            .unwrap();
        assert_eq!(answer, "42");
    }

    #[tokio::test]
    async fn test_generate_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).generate("qwen2.5:3b-instruct", "prompt", PARAMS).await;
        assert!(matches!(result, Err(Error::Generation(_))));
    }
}
