//! RagDesk Infer: embedding engine and embedding cache.
//!
//! Provides the `EmbedderBackend` trait for generating embeddings.
//! With the `onnx` feature and model files present, `OnnxEmbedder` runs
//! all-MiniLM-L6-v2 for 384-dim sentence embeddings. `HashingEmbedder` is
//! the local fallback: deterministic feature hashing with no model files.
//! `NoopEmbedder` stands in when no backend can be used, which makes
//! knowledge index construction fail with `DependencyUnavailable`.

pub mod cache;
pub mod embedder;
pub mod onnx_embedder;

pub use cache::{CacheStats, EmbeddingCache};
pub use embedder::{EmbedderBackend, EmbeddingResult, HashingEmbedder, NoopEmbedder};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

use ragdesk_core::EmbedderKind;

/// Create the embedder selected by `kind`.
///
/// `Auto` tries the sentence model in `model_dir` and falls back to hashing.
/// `Onnx` never falls back: an unloadable model yields a `NoopEmbedder`.
pub fn create_embedder(
    kind: EmbedderKind,
    model_dir: &Path,
    dim: usize,
) -> Arc<dyn EmbedderBackend> {
    if kind == EmbedderKind::Hashing {
        tracing::info!("Using hashing embedder (dim={})", dim);
        return Arc::new(HashingEmbedder::new(dim));
    }

    match load_sentence_model(model_dir) {
        Ok(embedder) => {
            tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
            return embedder;
        }
        Err(e) if kind == EmbedderKind::Onnx => {
            tracing::warn!("ONNX embedder required but unavailable: {}", e);
            return Arc::new(NoopEmbedder::new(dim));
        }
        Err(e) => {
            tracing::warn!("ONNX embedder unavailable: {}. Falling back to hashing.", e);
        }
    }

    tracing::info!("Using hashing embedder (dim={})", dim);
    Arc::new(HashingEmbedder::new(dim))
}

#[cfg(feature = "onnx")]
fn load_sentence_model(model_dir: &Path) -> Result<Arc<dyn EmbedderBackend>, String> {
    OnnxEmbedder::load(model_dir).map(|e| Arc::new(e) as Arc<dyn EmbedderBackend>)
}

#[cfg(not(feature = "onnx"))]
fn load_sentence_model(model_dir: &Path) -> Result<Arc<dyn EmbedderBackend>, String> {
    Err(format!(
        "built without the onnx feature, ignoring {}",
        model_dir.display()
    ))
}
