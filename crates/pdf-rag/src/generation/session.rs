//! Answer pipeline bound to one vector index

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::VectorIndex;
use crate::types::{Answer, SourceRef};

use super::prompt::PromptBuilder;

/// Minimum number of non-whitespace characters in a question
pub const MIN_QUESTION_CHARS: usize = 3;

/// Check a question and return it trimmed
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    let visible = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    if visible < MIN_QUESTION_CHARS {
        return Err(Error::InvalidInput(format!(
            "Question must contain at least {} non-whitespace characters",
            MIN_QUESTION_CHARS
        )));
    }
    Ok(trimmed)
}

/// Retrieval plus generation over a fixed index
///
/// Holds no per-query state; every call is independent.
pub struct RagSession {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl RagSession {
    /// Bind a session to an index
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            top_k: top_k.max(1),
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Answer a question, returning only the model output
    pub async fn query(&self, question: &str) -> Result<String> {
        Ok(self.answer(question).await?.text)
    }

    /// Answer a question along with the sources it was grounded on
    ///
    /// Generation failures are returned as-is, without retry.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = validate_question(question)?;
        tracing::info!("Processing question: {}", question);

        let query_embedding = self.embedder.embed(question).await?;
        let results = self.index.query(&query_embedding, self.top_k)?;
        tracing::debug!("Retrieved {} chunk(s) for question", results.len());

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);

        let text = self.llm.generate(&prompt).await.map_err(|e| match e {
            Error::Generation(_) => e,
            other => Error::generation(other.to_string()),
        })?;

        let sources = results
            .iter()
            .map(|r| SourceRef::from_chunk(&r.chunk, r.similarity))
            .collect();

        tracing::info!("Question processed successfully");
        Ok(Answer { text, sources })
    }
}
