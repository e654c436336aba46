use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// A user-authored record of a personal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub location: Option<Location>,
    pub media: Vec<MediaItem>,
    pub tags: Vec<String>,
    pub people: Vec<Person>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Memory {
    /// Calendar year of the memory's timestamp, in UTC.
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub relation: String,
}

/// Decoded image attached to a memory.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaItem")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A validated memory awaiting its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub location: Option<Location>,
    pub media: Vec<MediaItem>,
    pub tags: Vec<String>,
    pub people: Vec<Person>,
}

impl NewMemory {
    pub fn into_memory(self, id: String, now: DateTime<Utc>) -> Memory {
        Memory {
            id,
            title: self.title,
            description: self.description,
            timestamp: self.timestamp,
            location: self.location,
            media: self.media,
            tags: self.tags,
            people: self.people,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a stored memory. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// `Some(None)` clears the location.
    pub location: Option<Option<Location>>,
    /// Replaces the whole media set.
    pub media: Option<Vec<MediaItem>>,
    pub tags: Option<Vec<String>>,
    pub people: Option<Vec<Person>>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply scalar fields to `memory`; media is persisted separately by the store.
    pub fn apply(&self, memory: &mut Memory) {
        if let Some(title) = &self.title {
            memory.title = title.clone();
        }
        if let Some(description) = &self.description {
            memory.description = description.clone();
        }
        if let Some(timestamp) = self.timestamp {
            memory.timestamp = timestamp;
        }
        if let Some(location) = &self.location {
            memory.location = location.clone();
        }
        if let Some(tags) = &self.tags {
            memory.tags = tags.clone();
        }
        if let Some(people) = &self.people {
            memory.people = people.clone();
        }
        if let Some(media) = &self.media {
            memory.media = media.clone();
        }
    }
}

/// One stored image blob, as served by the media endpoint.
#[derive(Clone)]
pub struct StoredMedia {
    pub memory_id: String,
    pub filename: String,
    pub content_type: String,
    pub sha256: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StoredMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredMedia")
            .field("memory_id", &self.memory_id)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("sha256", &self.sha256)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A memory as read by full-store scans.
///
/// Only the primary image keeps its bytes; the rest are listed by name.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub location: Option<Location>,
    pub tags: Vec<String>,
    pub people: Vec<Person>,
    pub filenames: Vec<String>,
    /// First attached image; the timeline renders its thumbnail from it.
    pub primary_image: Option<MediaItem>,
}

impl From<Memory> for MemorySummary {
    fn from(memory: Memory) -> Self {
        let filenames = memory.media.iter().map(|m| m.filename.clone()).collect();
        Self {
            id: memory.id,
            title: memory.title,
            description: memory.description,
            timestamp: memory.timestamp,
            location: memory.location,
            tags: memory.tags,
            people: memory.people,
            filenames,
            primary_image: memory.media.into_iter().next(),
        }
    }
}

/// A page of memories in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub memories: Vec<MemorySummary>,
    /// Sequence number to resume after; `None` when the scan is complete.
    pub next_cursor: Option<i64>,
}
