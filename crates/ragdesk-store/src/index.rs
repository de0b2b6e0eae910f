//! In-memory vector index for one knowledge domain.

use std::collections::BTreeSet;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use ragdesk_core::{Domain, Error, Result};
use ragdesk_infer::EmbedderBackend;
use tracing::debug;

use crate::types::{IndexEntry, SearchHit};

/// Searchable representation of a domain's documents.
///
/// Rows of `matrix` are L2-normalised embeddings of `entries`, in insertion
/// order, so a single matrix-vector product yields cosine similarities.
pub struct KnowledgeIndex {
    domain: Domain,
    entries: Vec<IndexEntry>,
    matrix: Array2<f32>,
    embedder: Arc<dyn EmbedderBackend>,
}

impl KnowledgeIndex {
    /// An index with zero entries.
    pub fn empty(domain: Domain, embedder: Arc<dyn EmbedderBackend>) -> Self {
        let dim = embedder.dimension();
        Self {
            domain,
            entries: Vec::new(),
            matrix: Array2::zeros((0, dim)),
            embedder,
        }
    }

    /// Assemble an index from entries and their embeddings (same order).
    pub fn from_embeddings(
        domain: Domain,
        entries: Vec<IndexEntry>,
        embeddings: Vec<Array1<f32>>,
        embedder: Arc<dyn EmbedderBackend>,
    ) -> Result<Self> {
        if entries.len() != embeddings.len() {
            return Err(Error::Internal(format!(
                "{} entries but {} embeddings",
                entries.len(),
                embeddings.len()
            )));
        }

        let dim = embedder.dimension();
        let mut matrix = Array2::zeros((entries.len(), dim));
        for (i, emb) in embeddings.iter().enumerate() {
            if emb.len() != dim {
                return Err(Error::DependencyUnavailable(format!(
                    "embedding has dimension {}, expected {}",
                    emb.len(),
                    dim
                )));
            }
            matrix.row_mut(i).assign(emb);
        }

        // Normalize rows for cosine similarity via dot product
        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 1e-9 {
                row /= norm;
            }
        }

        Ok(Self {
            domain,
            entries,
            matrix,
            embedder,
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Source identifiers registered in this index.
    pub fn sources(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|e| e.metadata.source.clone())
            .collect()
    }

    /// Top-`k` entries by cosine similarity to `query`, best first.
    ///
    /// Equal scores keep insertion order. A query without any embeddable
    /// content scores 0 against every entry, so the first `k` entries are
    /// returned.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .ok_or_else(|| Error::Retrieval("embedder unavailable for query".into()))?
            .embedding;

        if query_embedding.len() != self.matrix.ncols() {
            return Err(Error::Retrieval(format!(
                "query embedding has dimension {}, index expects {}",
                query_embedding.len(),
                self.matrix.ncols()
            )));
        }

        let q_norm = query_embedding.dot(&query_embedding).sqrt();
        let q = if q_norm > 1e-9 {
            query_embedding / q_norm
        } else {
            query_embedding
        };

        // (N, dim) @ (dim,) -> (N,)
        let similarities = self.matrix.dot(&q);

        let mut ranked: Vec<(usize, f32)> = similarities.iter().copied().enumerate().collect();
        // Stable sort: ties stay in insertion order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);

        debug!(
            domain = %self.domain,
            hits = ranked.len(),
            "Searched knowledge index"
        );

        Ok(ranked
            .into_iter()
            .map(|(i, score)| SearchHit {
                content: self.entries[i].content.clone(),
                metadata: self.entries[i].metadata.clone(),
                score,
            })
            .collect())
    }
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("domain", &self.domain)
            .field("entries", &self.entries.len())
            .field("dimension", &self.matrix.ncols())
            .finish()
    }
}
