use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Memory, MemoryPage, MemoryPatch, NewMemory, StoredMedia};

/// Durable persistence for memories and their image blobs.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Assign the next identifier and persist the memory with all of its media
    /// atomically. Concurrent callers always receive distinct identifiers.
    async fn create_memory(&self, memory: NewMemory) -> Result<Memory>;
    async fn get_memory(&self, id: &str) -> Result<Option<Memory>>;
    async fn get_memory_by_seq(&self, seq: i64) -> Result<Option<Memory>>;
    /// Uniformly random memory, `None` when the store is empty.
    async fn random_memory(&self) -> Result<Option<Memory>>;
    /// Memories in insertion order, starting after sequence `after_seq`.
    async fn list_memories_page(&self, after_seq: i64, limit: u32) -> Result<MemoryPage>;
    async fn update_memory(&self, id: &str, patch: &MemoryPatch) -> Result<Option<Memory>>;
    async fn delete_memory(&self, id: &str) -> Result<bool>;
    async fn get_media(&self, id: &str, filename: &str) -> Result<Option<StoredMedia>>;
    async fn count_memories(&self) -> Result<u64>;
}

/// A complete database backend: the memory store plus lifecycle operations.
#[async_trait]
pub trait DatabaseBackend: MemoryStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Make every committed write durable in the main database file.
    async fn flush(&self) -> Result<()>;
}
