//! Embedding similarity retrieval scoped to the Selection Set

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::providers::{with_timeout, EmbeddingProvider};
use crate::storage::Database;
use crate::types::{DocumentId, Embedding};

/// Nearest-embedding retriever
pub struct SimilarityRetriever {
    db: Database,
    embedder: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl SimilarityRetriever {
    pub fn new(db: Database, embedder: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self {
            db,
            embedder,
            timeout,
        }
    }

    /// Up to `top_k` selected documents, closest first.
    ///
    /// A failed, late, or malformed query embedding yields an empty result
    /// rather than an error.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<DocumentId>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedded = with_timeout("embedding", self.timeout, self.embedder.embed(query)).await;
        let query_vector = match embedded.and_then(Embedding::new) {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(
                    provider = self.embedder.name(),
                    "Query embedding failed, returning no results: {}",
                    e
                );
                return Ok(Vec::new());
            }
        };

        let ids = self
            .db
            .run(move |db| {
                let selected = db.selected_document_ids()?;
                db.nearest_documents(&query_vector, &selected, top_k)
            })
            .await?;

        tracing::debug!(results = ids.len(), top_k, "Similarity retrieval");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::test_support::{seeded_db, CountingEmbedder, StubEmbedder};
    use std::sync::atomic::Ordering;

    const DOCS: [&str; 4] = [
        "Python is a programming language.",
        "The Eiffel Tower stands in Paris.",
        "Rust guarantees memory safety without garbage collection.",
        "Bread is baked from flour, water, and yeast.",
    ];

    fn retriever(db: Database) -> SimilarityRetriever {
        SimilarityRetriever::new(db, Arc::new(HashingEmbedder::new()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_empty_selection_returns_nothing() {
        let (db, _) = seeded_db(&DOCS);
        let retriever = retriever(db);
        for top_k in [1, 4, 50] {
            assert!(retriever.retrieve(DOCS[0], top_k).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_top_k_bound() {
        let (db, ids) = seeded_db(&DOCS);
        db.select_documents(&ids).unwrap();
        let retriever = retriever(db);
        let n = ids.len();

        for top_k in [0, 1, n, n + 10] {
            let results = retriever.retrieve("Paris tower", top_k).await.unwrap();
            assert_eq!(results.len(), top_k.min(n), "top_k = {}", top_k);
        }
    }

    #[tokio::test]
    async fn test_own_text_ranks_first() {
        let (db, ids) = seeded_db(&DOCS);
        db.select_documents(&ids).unwrap();
        let retriever = retriever(db);

        for (text, id) in DOCS.iter().zip(&ids) {
            let results = retriever.retrieve(text, 1).await.unwrap();
            assert_eq!(results, vec![*id]);
        }
    }

    #[tokio::test]
    async fn test_unselected_documents_never_returned() {
        let (db, ids) = seeded_db(&DOCS);
        db.select_documents(&[ids[1], ids[3]]).unwrap();
        let retriever = retriever(db);

        let results = retriever.retrieve(DOCS[0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(!results.contains(&ids[0]));
        assert!(!results.contains(&ids[2]));
    }

    #[tokio::test]
    async fn test_duplicate_selection_entries_do_not_duplicate_results() {
        let (db, ids) = seeded_db(&DOCS[..2]);
        db.select_documents(&[ids[0], ids[0], ids[1]]).unwrap();
        db.select_documents(&[ids[0]]).unwrap();
        let retriever = retriever(db);

        let results = retriever.retrieve(DOCS[0], 10).await.unwrap();
        assert_eq!(results, vec![ids[0], ids[1]]);
    }

    #[tokio::test]
    async fn test_zero_top_k_skips_provider() {
        let (db, ids) = seeded_db(&DOCS);
        db.select_documents(&ids).unwrap();
        let embedder = Arc::new(CountingEmbedder::default());
        let retriever = SimilarityRetriever::new(db, embedder.clone(), Duration::from_secs(5));

        assert!(retriever.retrieve("anything", 0).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

        retriever.retrieve("anything", 1).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_embedding_failures_degrade_to_empty() {
        let (db, ids) = seeded_db(&DOCS);
        db.select_documents(&ids).unwrap();

        let stubs = [
            StubEmbedder::Failing,
            StubEmbedder::WrongDimension(128),
            StubEmbedder::Slow(Duration::from_secs(5)),
        ];
        for stub in stubs {
            let retriever =
                SimilarityRetriever::new(db.clone(), Arc::new(stub), Duration::from_millis(50));
            assert!(retriever.retrieve(DOCS[0], 3).await.unwrap().is_empty());
        }
    }
}
