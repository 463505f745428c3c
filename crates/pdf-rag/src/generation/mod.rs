//! Answer generation: Ollama client, prompt template and the answer session

pub mod ollama;
pub mod prompt;
pub mod session;

pub use ollama::{GenerationParams, OllamaClient};
pub use prompt::PromptBuilder;
pub use session::{validate_question, RagSession};
