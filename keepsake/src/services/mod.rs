mod memory;
mod search;
mod timeline;
mod timeline_retry;

pub use memory::{IngestReport, MemoryService};
pub use search::SearchService;
pub use timeline::TimelineIndex;
pub use timeline_retry::TimelineRetry;
