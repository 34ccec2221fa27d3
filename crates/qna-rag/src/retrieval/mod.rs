//! Retrieval: similarity and BM25 rankers gated by the Selection Set

pub mod lexical;
pub mod selection;
pub mod similarity;

pub use lexical::{tokenize, Bm25Index, Bm25Params, LexicalRetriever};
pub use selection::SelectionService;
pub use similarity::SimilarityRetriever;

use crate::error::Result;
use crate::types::{DocumentId, RetrievalStrategy};

/// Dispatches a query to the retriever for the requested strategy
pub struct RetrievalService {
    similarity: SimilarityRetriever,
    lexical: LexicalRetriever,
}

impl RetrievalService {
    pub fn new(similarity: SimilarityRetriever, lexical: LexicalRetriever) -> Self {
        Self {
            similarity,
            lexical,
        }
    }

    pub fn similarity(&self) -> &SimilarityRetriever {
        &self.similarity
    }

    pub fn lexical(&self) -> &LexicalRetriever {
        &self.lexical
    }

    pub async fn retrieve(
        &self,
        strategy: RetrievalStrategy,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<DocumentId>> {
        match strategy {
            RetrievalStrategy::Similarity => self.similarity.retrieve(query, top_k).await,
            RetrievalStrategy::Bm25 => self.lexical.retrieve(query, top_k).await,
        }
    }
}
