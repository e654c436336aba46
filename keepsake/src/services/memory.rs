use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::DatabaseBackend;
use crate::error::{KeepsakeError, Result};
use crate::models::{Memory, MemoryPatch, MemoryRef, NewMemory, SkippedImage, StoredMedia};

use super::{SearchService, TimelineIndex, TimelineRetry};

/// Outcome of a successful ingest.
#[derive(Debug)]
pub struct IngestReport {
    pub memory: Memory,
    pub skipped: Vec<SkippedImage>,
}

/// Store access plus upkeep of the derived timeline and search views.
#[derive(Clone)]
pub struct MemoryService {
    db: Arc<dyn DatabaseBackend>,
    timeline: Arc<TimelineIndex>,
    search: SearchService,
    retry: TimelineRetry,
}

impl MemoryService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        timeline: Arc<TimelineIndex>,
        search: SearchService,
        retry: TimelineRetry,
    ) -> Self {
        Self {
            db,
            timeline,
            search,
            retry,
        }
    }

    pub async fn ingest(&self, memory: NewMemory, skipped: Vec<SkippedImage>) -> Result<IngestReport> {
        let memory = self.db.create_memory(memory).await?;
        info!(
            id = %memory.id,
            images = memory.media.len(),
            skipped = skipped.len(),
            "Memory stored"
        );

        self.refresh_derived(&memory.id).await;
        Ok(IngestReport { memory, skipped })
    }

    pub async fn get(&self, memory_ref: &MemoryRef) -> Result<Memory> {
        let found = match memory_ref {
            MemoryRef::Seq(seq) => self.db.get_memory_by_seq(*seq).await?,
            MemoryRef::Id(id) => self.db.get_memory(id).await?,
        };
        found.ok_or_else(|| KeepsakeError::NotFound(format!("memory {memory_ref}")))
    }

    pub async fn random(&self) -> Result<Memory> {
        self.db
            .random_memory()
            .await?
            .ok_or(KeepsakeError::EmptyStore)
    }

    pub async fn update(&self, memory_ref: &MemoryRef, patch: MemoryPatch) -> Result<Memory> {
        let current = self.get(memory_ref).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let updated = self
            .db
            .update_memory(&current.id, &patch)
            .await?
            .ok_or_else(|| KeepsakeError::NotFound(format!("memory {memory_ref}")))?;
        info!(id = %updated.id, "Memory updated");

        self.refresh_derived(&updated.id).await;
        Ok(updated)
    }

    pub async fn delete(&self, memory_ref: &MemoryRef) -> Result<()> {
        let current = self.get(memory_ref).await?;
        if !self.db.delete_memory(&current.id).await? {
            return Err(KeepsakeError::NotFound(format!("memory {memory_ref}")));
        }
        info!(id = %current.id, "Memory deleted");

        self.refresh_derived(&current.id).await;
        Ok(())
    }

    pub async fn media(&self, memory_ref: &MemoryRef, filename: &str) -> Result<StoredMedia> {
        let memory = self.get(memory_ref).await?;
        self.db
            .get_media(&memory.id, filename)
            .await?
            .ok_or_else(|| KeepsakeError::NotFound(format!("media {filename} of {}", memory.id)))
    }

    pub async fn count(&self) -> Result<u64> {
        self.db.count_memories().await
    }

    /// Ingest `memories` only when the store holds none. Returns how many were stored.
    pub async fn seed(&self, memories: Vec<NewMemory>) -> Result<usize> {
        if self.db.count_memories().await? > 0 {
            info!("Store already populated; skipping seed");
            return Ok(0);
        }

        let mut stored = 0;
        for memory in memories {
            self.ingest(memory, Vec::new()).await?;
            stored += 1;
        }
        info!(count = stored, "Seeded memories");
        Ok(stored)
    }

    /// Invalidate cached searches, then refresh the timeline entry for `id`.
    ///
    /// The refresh runs on its own task and completes even if the caller is
    /// dropped after the commit. A failed refresh is retried in the
    /// background; the caller still succeeds.
    async fn refresh_derived(&self, id: &str) {
        self.search.invalidate();

        let timeline = Arc::clone(&self.timeline);
        let retry = self.retry.clone();
        let id = id.to_string();
        let refresh = tokio::spawn(async move {
            match timeline.rebuild_entry(&id).await {
                Ok(()) => debug!(id = %id, "Timeline entry refreshed"),
                Err(e) => {
                    warn!(id = %id, error = %e, "Timeline refresh failed; scheduling retry");
                    retry.schedule(id);
                }
            }
        });

        if let Err(e) = refresh.await {
            warn!(error = %e, "Timeline refresh task did not complete");
        }
    }
}
