//! Semantic ranking support.
//!
//! Turning a description into a vector is the job of an external embedding
//! model; the catalog only needs something that hands it the vector.

use std::collections::HashMap;

/// Maps free text into the embedding space clips were indexed in.
pub trait TextEmbedder {
    /// Vector for `text`, or `None` when no embedding is available.
    fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for &T {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        (**self).embed(text)
    }
}

/// Pre-computed embeddings keyed by the exact query text.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, text: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(text.into(), vector);
    }

    pub fn contains(&self, text: &str) -> bool {
        self.vectors.contains_key(text)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl TextEmbedder for EmbeddingCache {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        self.vectors.get(text.trim()).cloned()
    }
}

/// Cosine similarity of two vectors.
///
/// `None` when the dimensions differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Little-endian f32 encoding used for the embedding BLOB column.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_none());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_embedding_blob_encoding() {
        let vector = vec![0.25_f32, -1.5, 3.0];
        let bytes = encode_embedding(&vector);
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_embedding(&bytes).unwrap(), vector);
        assert!(decode_embedding(&bytes[..5]).is_none());
    }

    #[test]
    fn test_cache_lookup_trims_text() {
        let mut cache = EmbeddingCache::new();
        cache.insert("grainy cctv", vec![1.0, 0.0]);
        assert_eq!(cache.embed("  grainy cctv "), Some(vec![1.0, 0.0]));
        assert!(cache.embed("sunset").is_none());
    }
}
