//! Process-wide knowledge base: one index per domain, swappable on reload.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use ragdesk_core::Domain;

use crate::index::KnowledgeIndex;

/// Immutable set of per-domain indices.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    indices: HashMap<Domain, Arc<KnowledgeIndex>>,
}

impl KnowledgeBase {
    pub fn new(indices: HashMap<Domain, Arc<KnowledgeIndex>>) -> Self {
        Self { indices }
    }

    pub fn get(&self, domain: Domain) -> Option<Arc<KnowledgeIndex>> {
        self.indices.get(&domain).cloned()
    }

    /// Entry count per known domain (0 for domains without a document).
    pub fn entry_counts(&self) -> BTreeMap<Domain, usize> {
        Domain::KNOWN
            .iter()
            .map(|&d| (d, self.indices.get(&d).map_or(0, |i| i.len())))
            .collect()
    }
}

/// Shared handle to the current knowledge base.
///
/// Readers take a cheap `Arc` snapshot; a reload swaps the whole base, so
/// in-flight queries finish against the snapshot they started with.
#[derive(Debug, Clone, Default)]
pub struct SharedKnowledge {
    current: Arc<RwLock<Arc<KnowledgeBase>>>,
}

impl SharedKnowledge {
    pub fn new(base: KnowledgeBase) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(base))),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        self.current.read().clone()
    }

    pub fn replace(&self, base: KnowledgeBase) {
        *self.current.write() = Arc::new(base);
    }
}
