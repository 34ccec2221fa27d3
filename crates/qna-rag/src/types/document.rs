//! Document, embedding, and identity types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of components in every stored embedding (all-MiniLM-L6-v2)
pub const EMBEDDING_DIM: usize = 384;

/// Store-assigned document identity. Valid identities are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(i64);

impl DocumentId {
    /// Identity that can never match a stored document
    pub const SENTINEL: DocumentId = DocumentId(-1);

    /// Wrap a raw identity, rejecting values outside the valid domain
    pub fn new(raw: i64) -> Result<Self> {
        if raw <= 0 {
            return Err(Error::validation(format!(
                "document id must be a positive integer, got {}",
                raw
            )));
        }
        Ok(Self(raw))
    }

    /// Wrap a rowid read back from the store
    pub(crate) fn from_row(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw integer value
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::validation(format!("malformed document id: {:?}", s)))?;
        Self::new(raw)
    }
}

/// Where a document came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// Submitted through the ingestion API
    #[default]
    Upload,
    /// Fetched from the arXiv API
    Arxiv,
}

impl DocumentSource {
    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::Upload => "upload",
            DocumentSource::Arxiv => "arxiv",
        }
    }

    /// Parse a column value; unknown tags read back as uploads
    pub fn from_db(value: &str) -> Self {
        match value {
            "arxiv" => DocumentSource::Arxiv,
            _ => DocumentSource::Upload,
        }
    }
}

/// A document about to be written
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub content: Vec<u8>,
    pub source: DocumentSource,
    pub url: Option<String>,
}

impl NewDocument {
    /// An uploaded text document
    pub fn upload(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into().into_bytes(),
            source: DocumentSource::Upload,
            url: None,
        }
    }

    /// A document fetched from an external source
    pub fn fetched(
        filename: impl Into<String>,
        content: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: content.into().into_bytes(),
            source: DocumentSource::Arxiv,
            url,
        }
    }

    /// Content decoded as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// A stored document
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub source: DocumentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub content_hash: String,
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    /// Content decoded as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// A vector known to have exactly [`EMBEDDING_DIM`] finite components
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Validate a raw provider vector
    pub fn new(vector: Vec<f32>) -> Result<Self> {
        if vector.len() != EMBEDDING_DIM {
            return Err(Error::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::embedding("embedding contains non-finite values"));
        }
        Ok(Self(vector))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Little-endian f32 encoding used by the embeddings table
    pub fn to_blob(&self) -> Vec<u8> {
        encode_vector(&self.0)
    }
}

pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn decode_vector(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_parsing() {
        assert_eq!("12".parse::<DocumentId>().unwrap().get(), 12);
        assert_eq!(" 3 ".parse::<DocumentId>().unwrap().get(), 3);
        assert!("abc".parse::<DocumentId>().is_err());
        assert!("1.5".parse::<DocumentId>().is_err());
        assert!("0".parse::<DocumentId>().is_err());
        assert!("-4".parse::<DocumentId>().is_err());
        assert!(DocumentId::new(DocumentId::SENTINEL.get()).is_err());
    }

    #[test]
    fn test_embedding_dimension() {
        assert!(Embedding::new(vec![0.1; EMBEDDING_DIM]).is_ok());

        match Embedding::new(vec![0.1; 383]) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 384);
                assert_eq!(actual, 383);
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }

        let mut bad = vec![0.0; EMBEDDING_DIM];
        bad[10] = f32::NAN;
        assert!(matches!(Embedding::new(bad.clone()), Err(Error::Embedding(_))));
        bad[10] = f32::INFINITY;
        assert!(matches!(Embedding::new(bad), Err(Error::Embedding(_))));
    }

    #[test]
    fn test_blob_encoding() {
        let embedding = Embedding::new((0..EMBEDDING_DIM).map(|i| i as f32 * 0.5).collect()).unwrap();
        let blob = embedding.to_blob();
        assert_eq!(blob.len(), EMBEDDING_DIM * 4);
        assert_eq!(decode_vector(&blob).unwrap(), embedding.as_slice());
        assert!(decode_vector(&[0u8; 3]).is_none());
    }
}
