use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::SearchResult;

#[derive(Clone)]
struct CachedResults {
    generation: u64,
    results: Arc<Vec<SearchResult>>,
}

/// Thread-safe LRU cache of search results keyed by normalised query.
///
/// Every store mutation bumps the generation. Results computed under an older
/// generation are never stored or served, so a search that races with a
/// write cannot repopulate the cache with stale hits.
#[derive(Clone)]
pub struct SearchResultCache {
    cache: Arc<Mutex<LruCache<String, CachedResults>>>,
    generation: Arc<AtomicU64>,
}

impl SearchResultCache {
    /// `None` when `capacity` is zero (caching disabled).
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Generation to tag a computation with; read it before scanning the store.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<SearchResult>>> {
        let current = self.generation();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        match cache.get(key) {
            Some(entry) if entry.generation == current => Some(Arc::clone(&entry.results)),
            Some(_) => {
                cache.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store results computed at `generation`. Dropped if a write happened since.
    pub fn put(&self, key: String, generation: u64, results: Arc<Vec<SearchResult>>) -> bool {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if generation != self.generation() {
            return false;
        }
        cache.put(
            key,
            CachedResults {
                generation,
                results,
            },
        );
        true
    }

    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
