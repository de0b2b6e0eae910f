//! Bounded LRU cache for embedding vectors.
//!
//! Embeddings are a pure function of their input text, so entries never
//! expire; the cache only evicts the least recently used entry at capacity.

use std::collections::{HashMap, VecDeque};

use ndarray::Array1;
use parking_lot::Mutex;

/// Hit/miss counters since the cache was created or last cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe LRU cache keyed by input text.
pub struct EmbeddingCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, Array1<f32>>,
    /// Front = least recently used.
    recency: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` embeddings.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                recency: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up an embedding and mark it as recently used.
    pub fn get(&self, text: &str) -> Option<Array1<f32>> {
        let mut inner = self.inner.lock();
        match inner.entries.get(text).cloned() {
            Some(embedding) => {
                inner.hits += 1;
                inner.touch(text);
                Some(embedding)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or refresh an embedding.
    pub fn put(&self, text: String, embedding: Array1<f32>) {
        let mut inner = self.inner.lock();

        if inner.entries.insert(text.clone(), embedding).is_some() {
            inner.touch(&text);
            return;
        }

        inner.recency.push_back(text);
        while inner.entries.len() > inner.capacity {
            match inner.recency.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }

    /// Drop all entries and reset counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
        inner.hits = 0;
        inner.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_hit_and_miss_counted() {
        let cache = EmbeddingCache::new(4);
        assert!(cache.get("pay").is_none());

        cache.put("pay".into(), array![1.0, 0.0]);
        assert_eq!(cache.get("pay").unwrap(), array![1.0, 0.0]);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".into(), array![1.0]);
        cache.put("b".into(), array![2.0]);

        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.put("c".into(), array![3.0]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".into(), array![1.0]);
        cache.put("a".into(), array![5.0]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap(), array![5.0]);
    }

    #[test]
    fn test_clear_resets() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".into(), array![1.0]);
        let _ = cache.get("a");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
