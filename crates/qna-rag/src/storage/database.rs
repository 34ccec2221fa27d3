//! SQLite storage for documents, embeddings, and the selection set
//!
//! Vectors are stored as little-endian f32 blobs. Nearest-neighbour ordering is
//! computed inside SQLite by the `l2_distance(blob, blob)` scalar function
//! registered on every connection, and id lists are bound with `rarray(?)`.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::document::decode_vector;
use crate::types::{Document, DocumentId, DocumentSource, Embedding, NewDocument, EMBEDDING_DIM};

/// SQLite-backed document, embedding, and selection store
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        rusqlite::vtab::array::load_module(&conn)?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Run a closure against the database on tokio's blocking pool
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                content BLOB NOT NULL,
                source TEXT NOT NULL DEFAULT 'upload',
                url TEXT,
                content_hash TEXT NOT NULL,
                ingested_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_filename ON documents(filename);

            CREATE TABLE IF NOT EXISTS embeddings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES documents(id),
                vector BLOB NOT NULL CHECK (length(vector) = {blob_len})
            );

            CREATE INDEX IF NOT EXISTS idx_embeddings_document_id ON embeddings(document_id);

            -- Duplicate entries per document are allowed
            CREATE TABLE IF NOT EXISTS selected_documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES documents(id)
            );

            CREATE INDEX IF NOT EXISTS idx_selected_documents_document_id
                ON selected_documents(document_id);
        "#,
            blob_len = EMBEDDING_DIM * 4
        ))?;

        tracing::debug!("Database migrations complete");
        Ok(())
    }

    // ==================== Documents ====================

    /// Insert a document and its embedding in one transaction.
    ///
    /// The document row is written first so its id is known; the vector is then
    /// validated and written. Any failure rolls back both rows.
    pub fn insert_document(&self, doc: &NewDocument, vector: Vec<f32>) -> Result<DocumentId> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO documents (filename, content, source, url, content_hash, ingested_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                doc.filename,
                doc.content,
                doc.source.as_str(),
                doc.url,
                content_hash(&doc.content),
                Utc::now(),
            ],
        )?;
        let id = DocumentId::from_row(tx.last_insert_rowid());

        let embedding = Embedding::new(vector)?;
        tx.execute(
            "INSERT INTO embeddings (document_id, vector) VALUES (?1, ?2)",
            params![id.get(), embedding.to_blob()],
        )?;

        tx.commit()?;
        Ok(id)
    }

    /// Get a document by id
    pub fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let doc = conn
            .query_row(
                "SELECT id, filename, content, source, url, content_hash, ingested_at
                 FROM documents WHERE id = ?1",
                params![id.get()],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    /// List all documents, oldest first
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, filename, content, source, url, content_hash, ingested_at
             FROM documents ORDER BY id",
        )?;
        let docs = stmt
            .query_map([], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    /// Number of stored documents
    pub fn document_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of stored embeddings
    pub fn embedding_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Raw content for the given ids, in the order given. Unknown ids are skipped.
    pub fn fetch_contents(&self, ids: &[DocumentId]) -> Result<Vec<(DocumentId, Vec<u8>)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, content FROM documents WHERE id IN rarray(?1)")?;
        let mut by_id: HashMap<DocumentId, Vec<u8>> = stmt
            .query_map(params![id_array(ids)], |row| {
                Ok((DocumentId::from_row(row.get(0)?), row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id).map(|content| (*id, content)))
            .collect())
    }

    // ==================== Selection ====================

    /// Add ids to the selection set. Every id must reference an existing
    /// document; otherwise nothing is inserted.
    pub fn select_documents(&self, ids: &[DocumentId]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut exists = tx.prepare("SELECT 1 FROM documents WHERE id = ?1")?;
            let mut insert = tx.prepare("INSERT INTO selected_documents (document_id) VALUES (?1)")?;
            for id in ids {
                if !exists.exists(params![id.get()])? {
                    return Err(Error::DocumentNotFound(id.get()));
                }
                insert.execute(params![id.get()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove every selection entry for the given ids. Unknown ids are ignored.
    pub fn deselect_documents(&self, ids: &[DocumentId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM selected_documents WHERE document_id IN rarray(?1)",
            params![id_array(ids)],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    /// Distinct selected ids, in order of first selection
    pub fn selected_document_ids(&self) -> Result<Vec<DocumentId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT document_id FROM selected_documents
             GROUP BY document_id ORDER BY MIN(id)",
        )?;
        let ids = stmt
            .query_map([], |row| Ok(DocumentId::from_row(row.get(0)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Whether a document currently has at least one selection entry
    pub fn is_selected(&self, id: DocumentId) -> Result<bool> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT 1 FROM selected_documents WHERE document_id = ?1")?;
        Ok(stmt.exists(params![id.get()])?)
    }

    /// Selected documents with their raw content, ordered by id
    pub fn selected_documents(&self) -> Result<Vec<(DocumentId, Vec<u8>)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, content FROM documents
             WHERE id IN (SELECT document_id FROM selected_documents)
             ORDER BY id",
        )?;
        let docs = stmt
            .query_map([], |row| {
                Ok((DocumentId::from_row(row.get(0)?), row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    // ==================== Embeddings ====================

    /// Documents among `candidates` ordered by ascending L2 distance between
    /// their embedding and `query`, ties broken by ascending id. An empty
    /// candidate list is bound as the sentinel id and matches nothing.
    pub fn nearest_documents(
        &self,
        query: &Embedding,
        candidates: &[DocumentId],
        top_k: usize,
    ) -> Result<Vec<DocumentId>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT document_id FROM embeddings
            WHERE document_id IN rarray(?1)
            GROUP BY document_id
            ORDER BY MIN(l2_distance(vector, ?2)) ASC, document_id ASC
            LIMIT ?3
            "#,
        )?;
        let ids = stmt
            .query_map(
                params![id_array(candidates), query.to_blob(), top_k as i64],
                |row| Ok(DocumentId::from_row(row.get(0)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "l2_distance",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let a = blob_arg(ctx, 0)?;
            let b = blob_arg(ctx, 1)?;
            if a.len() != b.len() {
                return Err(rusqlite::Error::UserFunctionError(
                    format!("vector length mismatch: {} vs {}", a.len(), b.len()).into(),
                ));
            }
            let sum: f64 = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| {
                    let d = f64::from(*x) - f64::from(*y);
                    d * d
                })
                .sum();
            Ok(sum.sqrt())
        },
    )?;
    Ok(())
}

fn blob_arg(ctx: &rusqlite::functions::Context<'_>, idx: usize) -> rusqlite::Result<Vec<f32>> {
    let blob = ctx
        .get_raw(idx)
        .as_blob()
        .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
    decode_vector(blob).ok_or_else(|| {
        rusqlite::Error::UserFunctionError("vector blob length is not a multiple of 4".into())
    })
}

/// Bind value for `rarray(?)`. An empty list becomes the sentinel id so the
/// filter matches nothing.
fn id_array(ids: &[DocumentId]) -> Rc<Vec<Value>> {
    let mut seen = HashSet::new();
    let mut values: Vec<Value> = ids
        .iter()
        .filter(|id| seen.insert(**id))
        .map(|id| Value::from(id.get()))
        .collect();
    if values.is_empty() {
        values.push(Value::from(DocumentId::SENTINEL.get()));
    }
    Rc::new(values)
}

fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let source: String = row.get(3)?;
    Ok(Document {
        id: DocumentId::from_row(row.get(0)?),
        filename: row.get(1)?,
        content: row.get(2)?,
        source: DocumentSource::from_db(&source),
        url: row.get(4)?,
        content_hash: row.get(5)?,
        ingested_at: row.get(6)?,
    })
}
