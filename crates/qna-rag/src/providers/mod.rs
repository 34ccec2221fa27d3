//! Provider abstractions for embeddings and chat LLMs
//!
//! Trait-based seams so the retrieval and ingestion services can switch between
//! Ollama, OpenAI, in-process ONNX, and the offline hashing embedder.

pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod ollama;
pub mod openai;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use openai::OpenAiChat;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Bound a provider call, mapping expiry to [`Error::Timeout`]
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation,
            seconds: limit.as_secs(),
        }),
    }
}
