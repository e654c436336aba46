use std::sync::Arc;
use std::time::Instant;

use futures::TryStreamExt;

use crate::db::{stream_memories, DatabaseBackend};
use crate::error::Result;
use crate::models::{memory_matches, SearchResult};
use crate::search::SearchResultCache;

#[derive(Clone)]
pub struct SearchService {
    db: Arc<dyn DatabaseBackend>,
    cache: Option<SearchResultCache>,
    page_size: u32,
}

impl SearchService {
    pub fn new(db: Arc<dyn DatabaseBackend>, cache_size: usize, page_size: u32) -> Self {
        Self {
            db,
            cache: SearchResultCache::new(cache_size),
            page_size,
        }
    }

    /// Case-insensitive substring search in insertion order.
    ///
    /// An empty or whitespace-only query returns every memory.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let needle = query.trim().to_lowercase();
        let limit = limit.unwrap_or(usize::MAX);

        let results = match &self.cache {
            None => self.scan(&needle, limit).await?,
            Some(cache) => {
                if let Some(hits) = cache.get(&needle) {
                    tracing::debug!(query = %needle, hits = hits.len(), "Search cache hit");
                    return Ok(hits.iter().take(limit).cloned().collect());
                }

                let generation = cache.generation();
                let all = Arc::new(self.scan(&needle, usize::MAX).await?);
                cache.put(needle.clone(), generation, Arc::clone(&all));
                all.iter().take(limit).cloned().collect()
            }
        };

        tracing::debug!(
            query = %needle,
            hits = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(results)
    }

    /// Drop cached results; called after every store mutation.
    pub fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }
    }

    async fn scan(&self, needle: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        if limit == 0 {
            return Ok(results);
        }

        let mut memories = stream_memories(Arc::clone(&self.db), self.page_size);
        while let Some(memory) = memories.try_next().await? {
            if memory_matches(&memory, needle) {
                results.push(SearchResult::from(&memory));
                if results.len() >= limit {
                    break;
                }
            }
        }
        Ok(results)
    }
}
