use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Datelike, Utc};
use futures::TryStreamExt;
use tracing::{debug, info, warn};

use crate::db::{stream_memories, DatabaseBackend, MemoryStore};
use crate::error::{KeepsakeError, Result};
use crate::media::make_thumbnail;
use crate::models::{seq_from_id, MemorySummary, TimelineEntry};

/// Newest first; equal timestamps in creation order.
type EntryKey = (Reverse<DateTime<Utc>>, i64, String);

fn entry_key(entry: &TimelineEntry) -> EntryKey {
    let seq = seq_from_id(&entry.id).unwrap_or(i64::MAX);
    (Reverse(entry.timestamp), seq, entry.id.clone())
}

struct Slot {
    year: i32,
    key: EntryKey,
    /// Ticket of the rebuild that produced the entry.
    ticket: u64,
}

#[derive(Default)]
struct TimelineState {
    years: BTreeMap<i32, BTreeMap<EntryKey, TimelineEntry>>,
    slots: HashMap<String, Slot>,
    /// Tickets of removals, kept only while an older rebuild is still running.
    tombstones: HashMap<String, u64>,
    /// Rebuilds older than the last full rebuild lose to it.
    floor: u64,
    running: BTreeSet<u64>,
}

impl TimelineState {
    /// Ticket of the newest rebuild applied to `id`.
    fn applied(&self, id: &str) -> u64 {
        self.slots
            .get(id)
            .map(|slot| slot.ticket)
            .or_else(|| self.tombstones.get(id).copied())
            .unwrap_or(self.floor)
    }

    fn take(&mut self, id: &str) -> Option<(TimelineEntry, u64)> {
        let slot = self.slots.remove(id)?;
        let bucket = self.years.get_mut(&slot.year)?;
        let entry = bucket.remove(&slot.key);
        if bucket.is_empty() {
            self.years.remove(&slot.year);
        }
        entry.map(|entry| (entry, slot.ticket))
    }

    fn insert(&mut self, entry: TimelineEntry, ticket: u64) {
        self.take(&entry.id);
        self.tombstones.remove(&entry.id);
        let year = entry.timestamp.year();
        let key = entry_key(&entry);
        self.slots.insert(
            entry.id.clone(),
            Slot {
                year,
                key: key.clone(),
                ticket,
            },
        );
        self.years.entry(year).or_default().insert(key, entry);
    }

    fn remove(&mut self, id: &str, ticket: u64) {
        self.take(id);
        self.tombstones.insert(id.to_string(), ticket);
    }

    /// Drop tombstones no running rebuild could be older than.
    fn prune(&mut self) {
        let oldest = self.running.first().copied().unwrap_or(u64::MAX);
        let floor = self.floor;
        self.tombstones
            .retain(|_, ticket| *ticket > oldest && *ticket > floor);
    }
}

/// Marks a rebuild as running until it is dropped, completed or not.
struct Running<'a> {
    index: &'a TimelineIndex,
    ticket: u64,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        let mut state = self.index.write();
        state.running.remove(&self.ticket);
        state.prune();
    }
}

/// Year-bucketed, newest-first projection of the store.
pub struct TimelineIndex {
    db: Arc<dyn DatabaseBackend>,
    state: RwLock<TimelineState>,
    tickets: AtomicU64,
    thumbnail_size: u32,
    page_size: u32,
}

impl TimelineIndex {
    pub fn new(db: Arc<dyn DatabaseBackend>, thumbnail_size: u32, page_size: u32) -> Self {
        Self {
            db,
            state: RwLock::new(TimelineState::default()),
            tickets: AtomicU64::new(1),
            thumbnail_size,
            page_size,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TimelineState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TimelineState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn start(&self) -> Running<'_> {
        let mut state = self.write();
        let ticket = self.tickets.fetch_add(1, Ordering::AcqRel);
        state.running.insert(ticket);
        Running {
            index: self,
            ticket,
        }
    }

    /// Reload one memory from the store and replace, insert or drop its entry.
    pub async fn rebuild_entry(&self, id: &str) -> Result<()> {
        let running = self.start();
        let ticket = running.ticket;
        let entry = match self.db.get_memory(id).await? {
            Some(memory) => Some(self.project(memory.into()).await?),
            None => None,
        };

        let mut state = self.write();
        if state.applied(id) > ticket {
            debug!(id, ticket, "Discarding superseded timeline rebuild");
            return Ok(());
        }
        match entry {
            Some(entry) => state.insert(entry, ticket),
            None => state.remove(id, ticket),
        }
        Ok(())
    }

    /// Rebuild the whole index from a full store scan.
    ///
    /// Entries refreshed by `rebuild_entry` while the scan ran are kept.
    pub async fn rebuild_all(&self) -> Result<usize> {
        let running = self.start();
        let ticket = running.ticket;
        let mut fresh = TimelineState::default();

        let mut memories = stream_memories(Arc::clone(&self.db), self.page_size);
        while let Some(memory) = memories.try_next().await? {
            fresh.insert(self.project(memory).await?, ticket);
        }

        let mut state = self.write();
        if state.floor > ticket {
            debug!(ticket, "Discarding superseded full timeline rebuild");
            return Ok(state.slots.len());
        }

        let newer: Vec<String> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.ticket > ticket)
            .map(|(id, _)| id.clone())
            .collect();
        for id in newer {
            if let Some((entry, applied)) = state.take(&id) {
                fresh.insert(entry, applied);
            }
        }
        for (id, applied) in &state.tombstones {
            if *applied > ticket {
                fresh.remove(id, *applied);
            }
        }
        fresh.floor = ticket;
        fresh.running = std::mem::take(&mut state.running);

        let count = fresh.slots.len();
        *state = fresh;
        info!(entries = count, years = state.years.len(), "Timeline rebuilt");
        Ok(count)
    }

    pub fn list_all(&self) -> Vec<TimelineEntry> {
        let state = self.read();
        state
            .years
            .values()
            .rev()
            .flat_map(|bucket| bucket.values().cloned())
            .collect()
    }

    pub fn list_by_year(&self, year: i32) -> Vec<TimelineEntry> {
        let state = self.read();
        state
            .years
            .get(&year)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct years with at least one entry, descending.
    pub fn years(&self) -> Vec<i32> {
        self.read().years.keys().rev().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn project(&self, memory: MemorySummary) -> Result<TimelineEntry> {
        let thumbnail = match memory.primary_image {
            Some(image) => {
                let bytes = image.bytes;
                let size = self.thumbnail_size;
                let rendered = tokio::task::spawn_blocking(move || make_thumbnail(&bytes, size))
                    .await
                    .map_err(|e| KeepsakeError::Internal(format!("thumbnail task failed: {e}")))?;
                match rendered {
                    Ok(thumb) => Some(thumb),
                    Err(e) => {
                        warn!(id = %memory.id, error = %e, "Primary image has no thumbnail");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(TimelineEntry {
            id: memory.id,
            title: memory.title,
            timestamp: memory.timestamp,
            thumbnail,
        })
    }
}
