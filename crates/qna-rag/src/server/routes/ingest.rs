//! Document ingestion endpoints

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::routes::ApiJson;
use crate::server::state::AppState;
use crate::types::{
    ArxivIngestRequest, ArxivIngestResponse, BatchIngestRequest, BatchItemResult, IngestRequest,
    IngestResponse,
};

/// POST /api/ingest - Ingest one text document
pub async fn ingest_document(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    let response = state.ingestion().ingest(&request).await?;
    Ok(Json(response))
}

/// POST /api/ingest/batch - Ingest several documents independently
pub async fn ingest_batch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchIngestRequest>,
) -> Result<Json<Vec<BatchItemResult>>> {
    let start = Instant::now();
    let results = state.ingestion().ingest_batch(&request.documents).await;
    tracing::info!(
        "Batch of {} processed in {}ms",
        results.len(),
        start.elapsed().as_millis()
    );
    Ok(Json(results))
}

/// POST /api/ingest/arxiv - Fetch papers from arXiv and ingest their abstracts
pub async fn ingest_from_arxiv(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ArxivIngestRequest>,
) -> Result<Json<ArxivIngestResponse>> {
    if request.query.trim().is_empty() {
        return Err(Error::validation("query must not be empty"));
    }
    let limit = request.limit.unwrap_or(state.config().arxiv.default_limit);

    let papers = state.arxiv().fetch(&request.query, limit).await?;
    let document_ids = state.ingestion().ingest_external(papers).await?;

    Ok(Json(ArxivIngestResponse {
        message: format!("{} papers ingested successfully!", document_ids.len()),
        document_ids,
    }))
}
