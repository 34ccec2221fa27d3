//! Document listing endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DocumentDetail, DocumentId, DocumentSummary};

/// GET /api/documents - List stored documents
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<DocumentSummary>>> {
    let docs = state.db().run(|db| db.list_documents()).await?;
    Ok(Json(docs.iter().map(DocumentSummary::from).collect()))
}

/// GET /api/documents/:id - Get one document with its content
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>> {
    let id: DocumentId = id.parse()?;

    let (doc, selected) = state
        .db()
        .run(move |db| {
            let doc = db
                .get_document(id)?
                .ok_or(Error::DocumentNotFound(id.get()))?;
            let selected = db.is_selected(id)?;
            Ok((doc, selected))
        })
        .await?;

    Ok(Json(DocumentDetail {
        summary: DocumentSummary::from(&doc),
        content_hash: doc.content_hash.clone(),
        content: doc.text(),
        selected,
    }))
}
