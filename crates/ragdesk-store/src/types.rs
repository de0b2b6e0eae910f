//! Data types for indexed entries and search results.

use ragdesk_core::Domain;
use serde::{Deserialize, Serialize};

/// Metadata attached to every retrievable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub topic: Domain,
    /// Origin identifier, e.g. `salary.txt`.
    pub source: String,
}

/// Raw text of one domain plus the identifier of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainText {
    pub text: String,
    pub source: String,
}

impl DomainText {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

/// One retrievable unit stored in an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub content: String,
    pub metadata: EntryMetadata,
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub metadata: EntryMetadata,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}
