//! qna-rag: question answering over a user-selected set of documents
//!
//! Documents are embedded and stored in SQLite. A Selection Set scopes both
//! retrievers (embedding similarity and BM25), and the retrieved texts ground
//! an LLM-generated answer.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use storage::Database;
pub use types::{Document, DocumentId, Embedding, RetrievalStrategy, EMBEDDING_DIM};
