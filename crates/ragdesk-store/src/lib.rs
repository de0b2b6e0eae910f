//! RagDesk Store: per-domain vector indices and the document store builder.
//!
//! Each knowledge domain gets one read-only `KnowledgeIndex`, built once at
//! startup and shared across sessions until an explicit reload.

pub mod builder;
pub mod chunking;
pub mod index;
pub mod knowledge;
pub mod types;

pub use builder::{build, build_index, load_domain_texts, BuildOptions};
pub use chunking::{RecursiveChunker, TextChunk};
pub use index::KnowledgeIndex;
pub use knowledge::{KnowledgeBase, SharedKnowledge};
pub use types::*;
