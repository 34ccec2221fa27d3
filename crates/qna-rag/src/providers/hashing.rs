//! Deterministic feature-hashing embedder
//!
//! Maps lowercased Unicode words into [`EMBEDDING_DIM`] signed buckets and
//! L2-normalizes the result. Needs no model or network, so it backs offline
//! runs and tests. Identical texts always produce identical vectors.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::types::EMBEDDING_DIM;

use super::embedding::EmbeddingProvider;

/// Feature-hashing embedder
#[derive(Debug, Clone, Default)]
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub fn new() -> Self {
        Self
    }

    /// Embed synchronously
    pub fn embed_sync(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];

        for word in text.unicode_words() {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(bucket) % EMBEDDING_DIM as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut vector {
                *val /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_string();
        Ok(tokio::task::spawn_blocking(move || Self::embed_sync(&text)).await?)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let a = HashingEmbedder::embed_sync("Python is a programming language.");
        let b = HashingEmbedder::embed_sync("python IS a Programming language");
        assert_eq!(a.len(), EMBEDDING_DIM);
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashingEmbedder::embed_sync("  ... ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_shared_words_are_closer() {
        let query = HashingEmbedder::embed_sync("Python");
        let related = HashingEmbedder::embed_sync("Python is a programming language.");
        let unrelated = HashingEmbedder::embed_sync("The Eiffel Tower stands in Paris.");
        assert!(l2(&query, &related) < l2(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_provider_dimensions() {
        let embedder = HashingEmbedder::new();
        let v = embedder.embed("hello world").await.unwrap();
        assert_eq!(v.len(), embedder.dimensions());
        assert_eq!(embedder.name(), "hashing");
    }
}
