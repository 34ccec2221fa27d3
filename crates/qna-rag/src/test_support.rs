//! Shared fixtures for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, HashingEmbedder, LlmProvider};
use crate::storage::Database;
use crate::types::{DocumentId, NewDocument, EMBEDDING_DIM};

/// In-memory database holding one document per text, embedded with the
/// hashing embedder, named `doc{n}.txt`. Nothing is selected.
pub(crate) fn seeded_db(texts: &[&str]) -> (Database, Vec<DocumentId>) {
    let db = Database::in_memory().unwrap();
    let ids = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            db.insert_document(
                &NewDocument::upload(format!("doc{}.txt", i + 1), *text),
                HashingEmbedder::embed_sync(text),
            )
            .unwrap()
        })
        .collect();
    (db, ids)
}

/// LLM that returns a fixed answer and records the prompts it saw
pub(crate) struct ScriptedLlm {
    answer: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedLlm {
    pub(crate) fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            answer: None,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn last_prompt(&self) -> Option<(String, String)> {
        self.prompts.lock().last().cloned()
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        self.prompts.lock().push((system.to_string(), user.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer
            .clone()
            .ok_or_else(|| Error::llm("scripted failure"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.answer.is_some())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Embedder whose behavior is fixed per test
pub(crate) enum StubEmbedder {
    /// Always errors
    Failing,
    /// Returns a vector of the given length
    WrongDimension(usize),
    /// Sleeps before answering
    Slow(Duration),
}

/// Counts embed calls on top of the hashing embedder
#[derive(Default)]
pub(crate) struct CountingEmbedder {
    pub(crate) calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HashingEmbedder::embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            StubEmbedder::Failing => Err(Error::embedding("stub failure")),
            StubEmbedder::WrongDimension(len) => Ok(vec![0.1; *len]),
            StubEmbedder::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(HashingEmbedder::embed_sync(text))
            }
        }
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!matches!(self, StubEmbedder::Failing))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
