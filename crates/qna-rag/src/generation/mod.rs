//! Answer generation from retrieved documents

pub mod ollama;
pub mod prompt;
pub mod synthesizer;

pub use ollama::OllamaClient;
pub use prompt::{PromptBuilder, NO_DOCUMENTS_PLACEHOLDER, SYSTEM_PROMPT};
pub use synthesizer::AnswerSynthesizer;
