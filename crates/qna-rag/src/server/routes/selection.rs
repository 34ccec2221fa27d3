//! Selection Set endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::routes::ApiJson;
use crate::server::state::AppState;
use crate::types::{DeselectResponse, MessageResponse, SelectionRequest, SelectionResponse};

/// GET /api/selection - Currently selected document ids
pub async fn list_selection(State(state): State<AppState>) -> Result<Json<SelectionResponse>> {
    let selected_documents = state.selection().list().await?;
    Ok(Json(SelectionResponse { selected_documents }))
}

/// POST /api/selection/add - Select documents
pub async fn select_documents(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SelectionRequest>,
) -> Result<Json<MessageResponse>> {
    let ids = request.parse_ids()?;
    state.selection().select(ids).await?;
    Ok(Json(MessageResponse::new("Documents selected successfully")))
}

/// POST /api/selection/remove - Deselect documents
pub async fn deselect_documents(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SelectionRequest>,
) -> Result<Json<DeselectResponse>> {
    let ids = request.parse_ids()?;
    let removed = state.selection().deselect(ids).await?;
    Ok(Json(DeselectResponse {
        message: "Documents deselected successfully".to_string(),
        removed,
    }))
}
