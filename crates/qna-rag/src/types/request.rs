//! Request payloads, validated at the HTTP boundary

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::DocumentId;
use crate::error::{Error, Result};

/// A single document to ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub filename: String,
    pub content: String,
}

impl IngestRequest {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Reject empty filenames and blank content
    pub fn validate(&self) -> Result<()> {
        if self.filename.trim().is_empty() {
            return Err(Error::validation("filename must not be empty"));
        }
        if self.content.trim().is_empty() {
            return Err(Error::validation(format!(
                "content of '{}' must not be empty",
                self.filename
            )));
        }
        Ok(())
    }
}

/// Several documents ingested independently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchIngestRequest {
    pub documents: Vec<IngestRequest>,
}

/// Fetch and ingest papers from arXiv
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivIngestRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Document identities to select or deselect.
///
/// Identities may be JSON numbers or numeric strings; anything else is
/// rejected when parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub document_ids: Vec<Value>,
}

impl SelectionRequest {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            document_ids: ids.into_iter().map(Value::from).collect(),
        }
    }

    /// Parse every identity, failing on the first malformed one
    pub fn parse_ids(&self) -> Result<Vec<DocumentId>> {
        self.document_ids.iter().map(parse_document_id).collect()
    }
}

fn parse_document_id(value: &Value) -> Result<DocumentId> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(raw) => DocumentId::new(raw),
            None => Err(Error::validation(format!("malformed document id: {}", n))),
        },
        Value::String(s) => s.parse(),
        other => Err(Error::validation(format!("malformed document id: {}", other))),
    }
}

/// Retrieval strategy used to pick context for an answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    /// Nearest embeddings
    #[default]
    Similarity,
    /// BM25 term ranking
    Bm25,
}

impl RetrievalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStrategy::Similarity => "similarity",
            RetrievalStrategy::Bm25 => "bm25",
        }
    }
}

/// Similarity or lexical search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(alias = "query")]
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Question to answer from the selected documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(alias = "query")]
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub strategy: RetrievalStrategy,
}
