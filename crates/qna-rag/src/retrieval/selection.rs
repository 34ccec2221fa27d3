//! Selection Set maintenance

use crate::error::Result;
use crate::storage::Database;
use crate::types::DocumentId;

/// Adds, removes, and lists the documents eligible for retrieval
#[derive(Clone)]
pub struct SelectionService {
    db: Database,
}

impl SelectionService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Select documents. Every id must exist; otherwise nothing is selected.
    pub async fn select(&self, ids: Vec<DocumentId>) -> Result<()> {
        let count = ids.len();
        self.db.run(move |db| db.select_documents(&ids)).await?;
        tracing::info!("Selected {} document(s)", count);
        Ok(())
    }

    /// Remove every selection entry for the ids; returns the entries removed
    pub async fn deselect(&self, ids: Vec<DocumentId>) -> Result<usize> {
        let removed = self.db.run(move |db| db.deselect_documents(&ids)).await?;
        tracing::info!("Removed {} selection entries", removed);
        Ok(removed)
    }

    /// Distinct selected ids, in order of first selection
    pub async fn list(&self) -> Result<Vec<DocumentId>> {
        self.db.run(|db| db.selected_document_ids()).await
    }
}
