//! Document ingestion: embed, then persist document and embedding together

pub mod arxiv;

pub use arxiv::{ArxivClient, ArxivPaper};

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::providers::{with_timeout, EmbeddingProvider};
use crate::storage::Database;
use crate::types::{BatchItemResult, DocumentId, IngestRequest, IngestResponse, NewDocument};

/// Ingestion pipeline
pub struct IngestionService {
    db: Database,
    embedder: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    batch_concurrency: usize,
}

impl IngestionService {
    pub fn new(
        db: Database,
        embedder: Arc<dyn EmbeddingProvider>,
        timeout: Duration,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            db,
            embedder,
            timeout,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    /// Validate, embed, and store one uploaded document
    pub async fn ingest(&self, request: &IngestRequest) -> Result<IngestResponse> {
        request.validate()?;
        let doc = NewDocument::upload(request.filename.clone(), request.content.clone());
        let id = self.store(doc).await?;
        Ok(IngestResponse::new(id))
    }

    /// Ingest each document independently; results follow input order
    pub async fn ingest_batch(&self, requests: &[IngestRequest]) -> Vec<BatchItemResult> {
        let results: Vec<BatchItemResult> = stream::iter(requests.iter().cloned())
            .map(|request| async move {
                match self.ingest(&request).await {
                    Ok(response) => BatchItemResult::success(request.filename.clone(), response),
                    Err(e) => {
                        tracing::warn!("Failed to ingest {}: {}", request.filename, e);
                        BatchItemResult::failure(request.filename.clone(), e)
                    }
                }
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        let ok = results.iter().filter(|r| r.is_success()).count();
        tracing::info!("Batch ingestion: {}/{} succeeded", ok, results.len());
        results
    }

    /// Store fetched papers (title as filename, abstract as content).
    /// Papers without an abstract are skipped.
    pub async fn ingest_external(&self, papers: Vec<ArxivPaper>) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::with_capacity(papers.len());
        for paper in papers {
            if paper.summary.trim().is_empty() || paper.title.trim().is_empty() {
                tracing::warn!("Skipping arXiv entry without title or abstract: {:?}", paper.url);
                continue;
            }
            let doc = NewDocument::fetched(paper.title, paper.summary, paper.url);
            ids.push(self.store(doc).await?);
        }
        Ok(ids)
    }

    async fn store(&self, doc: NewDocument) -> Result<DocumentId> {
        let text = doc.text();
        let vector = with_timeout("embedding", self.timeout, self.embedder.embed(&text)).await?;

        let filename = doc.filename.clone();
        let id = self
            .db
            .run(move |db| db.insert_document(&doc, vector))
            .await?;

        tracing::info!("Ingested {} as document {}", filename, id);
        Ok(id)
    }
}
