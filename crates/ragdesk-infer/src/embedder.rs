//! Embedding engine trait and implementations.
//!
//! The `EmbedderBackend` trait abstracts over embedding generation.
//! Implementations:
//! - `HashingEmbedder`: signed feature hashing of word unigrams and bigrams
//! - `NoopEmbedder`: returns None to signal no embeddings available

use ndarray::Array1;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::cache::EmbeddingCache;
use ragdesk_core::config::DEFAULT_EMBEDDING_DIM;

/// Embeddings kept per process; domain documents plus recent queries.
const CACHE_CAPACITY: usize = 1024;
/// Bigrams carry less weight than single tokens.
const BIGRAM_WEIGHT: f32 = 0.5;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("valid token regex"));

/// Result of an embedding operation.
pub struct EmbeddingResult {
    /// Float32 embedding vector.
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    /// Returns None if the embedder is not available.
    fn embed(&self, text: &str) -> Option<EmbeddingResult>;

    /// Generate embeddings for a batch of texts, preserving order.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Option<EmbeddingResult>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Check if the embedder is available.
    fn is_available(&self) -> bool;
}

/// Placeholder embedder that always returns None.
pub struct NoopEmbedder {
    dim: usize,
}

impl NoopEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbedderBackend for NoopEmbedder {
    fn embed(&self, _text: &str) -> Option<EmbeddingResult> {
        None
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Deterministic bag-of-words embedder.
///
/// Every lower-cased alphanumeric token and adjacent token pair is hashed
/// with SHA-256 into one of `dim` buckets with a ±1 sign. Identical input
/// always produces the identical vector, across processes and platforms.
pub struct HashingEmbedder {
    dim: usize,
    cache: EmbeddingCache,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            cache: EmbeddingCache::new(CACHE_CAPACITY),
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    fn compute(&self, text: &str) -> Array1<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_RE.find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut vector = Array1::zeros(self.dim);
        for token in &tokens {
            let (bucket, sign) = self.bucket(token);
            vector[bucket] += sign;
        }
        for pair in tokens.windows(2) {
            let (bucket, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[bucket] += sign * BIGRAM_WEIGHT;
        }
        vector
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(head) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbedderBackend for HashingEmbedder {
    fn embed(&self, text: &str) -> Option<EmbeddingResult> {
        if let Some(cached) = self.cache.get(text) {
            return Some(EmbeddingResult {
                embedding: cached,
                cached: true,
            });
        }

        let embedding = self.compute(text);
        self.cache.put(text.to_string(), embedding.clone());

        Some(EmbeddingResult {
            embedding,
            cached: false,
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        true
    }
}
