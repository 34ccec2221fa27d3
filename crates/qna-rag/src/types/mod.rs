//! Core types for the Q&A service

pub mod document;
pub mod request;
pub mod response;

pub use document::{Document, DocumentId, DocumentSource, Embedding, NewDocument, EMBEDDING_DIM};
pub use request::{
    ArxivIngestRequest, AskRequest, BatchIngestRequest, IngestRequest, RetrievalStrategy,
    SearchRequest, SelectionRequest,
};
pub use response::{
    ArxivIngestResponse, AskResponse, BatchItemResult, DeselectResponse, DocumentDetail,
    DocumentSummary, IngestResponse, MessageResponse, SearchResponse, SelectionResponse,
};
