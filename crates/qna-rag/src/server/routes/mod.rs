//! API routes for the Q&A server

pub mod documents;
pub mod ingest;
pub mod query;
pub mod selection;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequest, Request},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::server::state::AppState;

/// `Json` extractor whose rejections use the service error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(Error::validation(rejection.body_text())),
        }
    }
}

/// Build all API routes
pub fn api_routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion
        .route(
            "/ingest",
            post(ingest::ingest_document).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route(
            "/ingest/batch",
            post(ingest::ingest_batch).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/ingest/arxiv", post(ingest::ingest_from_arxiv))
        // Selection
        .route("/selection", get(selection::list_selection))
        .route("/selection/add", post(selection::select_documents))
        .route("/selection/remove", post(selection::deselect_documents))
        // Retrieval and answers
        .route("/search", post(query::similarity_search))
        .route("/search/bm25", post(query::bm25_search))
        .route("/ask", post(query::ask))
        // Documents
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", get(documents::get_document))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "qna-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over a user-selected set of documents",
        "endpoints": {
            "POST /api/ingest": "Ingest one text document",
            "POST /api/ingest/batch": "Ingest several documents",
            "POST /api/ingest/arxiv": "Fetch and ingest arXiv abstracts",
            "GET /api/selection": "List selected document ids",
            "POST /api/selection/add": "Select documents for retrieval",
            "POST /api/selection/remove": "Deselect documents",
            "POST /api/search": "Similarity search over selected documents",
            "POST /api/search/bm25": "BM25 search over selected documents",
            "POST /api/ask": "Answer a question from selected documents",
            "GET /api/documents": "List all documents",
            "GET /api/documents/:id": "Get document details"
        }
    }))
}
