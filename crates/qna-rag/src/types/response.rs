//! Response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentId, DocumentSource};

/// Acknowledgment for one ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub document_id: DocumentId,
}

impl IngestResponse {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            message: "Document processed successfully".to_string(),
            document_id,
        }
    }
}

/// Per-document outcome of a batch ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn success(filename: String, response: IngestResponse) -> Self {
        Self {
            filename,
            document_id: Some(response.document_id),
            message: Some(response.message),
            error: None,
        }
    }

    pub fn failure(filename: String, error: impl ToString) -> Self {
        Self {
            filename,
            document_id: None,
            message: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of an arXiv ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivIngestResponse {
    pub message: String,
    pub document_ids: Vec<DocumentId>,
}

/// Plain acknowledgment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgment for a deselection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeselectResponse {
    pub message: String,
    /// Selection entries removed
    pub removed: usize,
}

/// Current selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub selected_documents: Vec<DocumentId>,
}

/// Ranked document identities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub documents: Vec<DocumentId>,
}

/// Synthesized answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

/// Document listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub filename: String,
    pub source: DocumentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub size: usize,
    pub ingested_at: DateTime<Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            source: doc.source,
            url: doc.url.clone(),
            size: doc.content.len(),
            ingested_at: doc.ingested_at,
        }
    }
}

/// Full document with decoded content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub content_hash: String,
    pub content: String,
    pub selected: bool,
}
