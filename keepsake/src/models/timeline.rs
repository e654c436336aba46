use chrono::{DateTime, Utc};

/// Compact projection of a memory for chronological browsing.
#[derive(Clone, PartialEq)]
pub struct TimelineEntry {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// JPEG thumbnail of the first image, when one could be rendered.
    pub thumbnail: Option<Vec<u8>>,
}

impl std::fmt::Debug for TimelineEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineEntry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("timestamp", &self.timestamp)
            .field("thumbnail_len", &self.thumbnail.as_ref().map(Vec::len))
            .finish()
    }
}
