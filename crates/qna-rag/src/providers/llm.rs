//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for chat-completion answer generation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI-compatible `/v1/chat/completions`
/// - `OllamaLlm`: Local Ollama server `/api/chat`
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one system and one user message, return the assistant text
    async fn chat(&self, system: &str, user: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
