//! Search and question-answering endpoints

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::routes::ApiJson;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse, SearchRequest, SearchResponse};

/// POST /api/search - Similarity search over the selected documents
pub async fn similarity_search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let top_k = request.top_k.unwrap_or_else(|| state.default_top_k());
    let documents = state
        .retrieval()
        .similarity()
        .retrieve(&request.question, top_k)
        .await?;
    Ok(Json(SearchResponse { documents }))
}

/// POST /api/search/bm25 - BM25 search over the selected documents
pub async fn bm25_search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let top_k = request.top_k.unwrap_or_else(|| state.default_top_k());
    let documents = state
        .retrieval()
        .lexical()
        .retrieve(&request.question, top_k)
        .await?;
    Ok(Json(SearchResponse { documents }))
}

/// POST /api/ask - Answer a question from the selected documents
pub async fn ask(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();

    if request.question.trim().is_empty() {
        return Err(Error::validation("question must not be empty"));
    }

    tracing::info!("Question: \"{}\"", request.question);

    let top_k = request.top_k.unwrap_or_else(|| state.default_top_k());
    let ids = state
        .retrieval()
        .retrieve(request.strategy, &request.question, top_k)
        .await?;

    let answer = state.synthesizer().synthesize(&request.question, &ids).await?;

    tracing::info!(
        "Answered in {}ms from {} document(s) ({})",
        start.elapsed().as_millis(),
        ids.len(),
        request.strategy.as_str()
    );

    Ok(Json(AskResponse {
        question: request.question,
        answer,
    }))
}
