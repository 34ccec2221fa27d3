//! Turns retrieved documents and a question into an LLM answer

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::providers::{with_timeout, LlmProvider};
use crate::storage::Database;
use crate::types::DocumentId;

use super::prompt::{PromptBuilder, SYSTEM_PROMPT};

/// Fetches document texts in retrieval order and asks the LLM
pub struct AnswerSynthesizer {
    db: Database,
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(db: Database, llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { db, llm, timeout }
    }

    /// Raw texts of the given documents, in the order given
    pub async fn fetch_texts(&self, ids: &[DocumentId]) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        let contents = self.db.run(move |db| db.fetch_contents(&ids)).await?;
        Ok(contents
            .into_iter()
            .map(|(_, content)| String::from_utf8_lossy(&content).into_owned())
            .collect())
    }

    /// Answer `question` grounded on the documents `ids`.
    ///
    /// An empty id list still produces an answer, with the no-documents
    /// placeholder as context. The LLM reply is returned unmodified.
    pub async fn synthesize(&self, question: &str, ids: &[DocumentId]) -> Result<String> {
        let texts = self.fetch_texts(ids).await?;
        let context = PromptBuilder::build_context(&texts);
        let user_prompt = PromptBuilder::build_user_prompt(question, &context);

        tracing::debug!(
            documents = texts.len(),
            llm = self.llm.name(),
            "Synthesizing answer"
        );

        with_timeout("llm", self.timeout, self.llm.chat(SYSTEM_PROMPT, &user_prompt)).await
    }
}
