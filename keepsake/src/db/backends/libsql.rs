use crate::db::connection::Database;
use crate::db::repository::{MediaRepository, MemoryRepository};
use crate::db::traits::{DatabaseBackend, MemoryStore};
use crate::db::MetadataRepository;
use crate::error::Result;
use crate::models::{memory_id, Memory, MemoryPage, MemoryPatch, NewMemory, StoredMedia};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Transaction, TransactionBehavior};
use tokio::sync::Mutex;

pub struct LibSqlBackend {
    db: Database,
    /// Serialises writers inside this process; SQLite allows one at a time.
    write_lock: Mutex<()>,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    async fn begin(conn: &Connection) -> Result<Transaction> {
        Ok(conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?)
    }

    async fn finish<T>(tx: Transaction, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(error = %rollback_error, "Rollback failed");
                }
                Err(error)
            }
        }
    }

    async fn insert_new(conn: &Connection, memory: NewMemory) -> Result<Memory> {
        let seq = MetadataRepository::next_sequence(conn).await?;
        let memory = memory.into_memory(memory_id(seq), Utc::now());
        MemoryRepository::insert(conn, seq, &memory).await?;
        Ok(memory)
    }

    async fn apply_patch(conn: &Connection, id: &str, patch: &MemoryPatch) -> Result<Option<Memory>> {
        let Some(mut memory) = MemoryRepository::get_by_id(conn, id).await? else {
            return Ok(None);
        };

        patch.apply(&mut memory);
        memory.updated_at = Utc::now();
        MemoryRepository::update(conn, &memory).await?;

        if let Some(media) = &patch.media {
            MediaRepository::delete_for_memory(conn, id).await?;
            MediaRepository::insert_all(conn, id, media).await?;
        }

        Ok(Some(memory))
    }
}

#[async_trait]
impl MemoryStore for LibSqlBackend {
    async fn create_memory(&self, memory: NewMemory) -> Result<Memory> {
        let _guard = self.write_lock.lock().await;
        let conn = self.db.connect().await?;
        let tx = Self::begin(&conn).await?;
        let outcome = Self::insert_new(&tx, memory).await;
        let created = Self::finish(tx, outcome).await?;

        tracing::debug!(id = %created.id, images = created.media.len(), "Memory created");
        Ok(created)
    }
    async fn get_memory(&self, id: &str) -> Result<Option<Memory>> {
        let conn = self.db.connect().await?;
        MemoryRepository::get_by_id(&conn, id).await
    }
    async fn get_memory_by_seq(&self, seq: i64) -> Result<Option<Memory>> {
        let conn = self.db.connect().await?;
        MemoryRepository::get_by_seq(&conn, seq).await
    }
    async fn random_memory(&self) -> Result<Option<Memory>> {
        let conn = self.db.connect().await?;
        MemoryRepository::random(&conn).await
    }
    async fn list_memories_page(&self, after_seq: i64, limit: u32) -> Result<MemoryPage> {
        let conn = self.db.connect().await?;
        let limit = limit.max(1);
        let page = MemoryRepository::list_after(&conn, after_seq, limit).await?;

        let next_cursor = if page.scanned == limit {
            page.last_seq
        } else {
            None
        };

        Ok(MemoryPage {
            memories: page.memories,
            next_cursor,
        })
    }
    async fn update_memory(&self, id: &str, patch: &MemoryPatch) -> Result<Option<Memory>> {
        let _guard = self.write_lock.lock().await;
        let conn = self.db.connect().await?;
        let tx = Self::begin(&conn).await?;
        let outcome = Self::apply_patch(&tx, id, patch).await;
        Self::finish(tx, outcome).await
    }
    async fn delete_memory(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let conn = self.db.connect().await?;
        let tx = Self::begin(&conn).await?;
        let outcome = MemoryRepository::delete(&tx, id).await;
        Self::finish(tx, outcome).await
    }
    async fn get_media(&self, id: &str, filename: &str) -> Result<Option<StoredMedia>> {
        let conn = self.db.connect().await?;
        MediaRepository::get(&conn, id, filename).await
    }
    async fn count_memories(&self) -> Result<u64> {
        let conn = self.db.connect().await?;
        MemoryRepository::count(&conn).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.db.flush().await
    }
}
