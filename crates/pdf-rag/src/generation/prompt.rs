//! Prompt templates for RAG generation

use crate::retrieval::SearchResult;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate retrieved chunk text, best match first
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full RAG prompt
    ///
    /// The model answers from the context first and falls back to general
    /// knowledge, saying so, when the context is insufficient.
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a helpful assistant. First, try to answer using only the context below.
If the context does not contain sufficient information to answer the question,
indicate this clearly and then use your general knowledge to provide a helpful response.

Context:
{context}

Question: {question}

Answer:
"#,
            context = context,
            question = question.trim()
        )
    }
}
