use std::sync::Arc;

use async_stream::try_stream;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::error::Result;
use crate::models::MemorySummary;

use super::{DatabaseBackend, MemoryStore};

/// Lazily walk every memory summary in insertion order, one page at a time.
///
/// Pages are fetched on demand, so callers that stop early never read the
/// rest of the store. Memories created during the walk are included.
pub fn stream_memories(
    db: Arc<dyn DatabaseBackend>,
    page_size: u32,
) -> BoxStream<'static, Result<MemorySummary>> {
    paged(db, page_size.max(1)).boxed()
}

fn paged(
    db: Arc<dyn DatabaseBackend>,
    page_size: u32,
) -> impl Stream<Item = Result<MemorySummary>> + Send + 'static {
    try_stream! {
        let mut cursor = 0i64;
        loop {
            let page = db.list_memories_page(cursor, page_size).await?;
            for memory in page.memories {
                yield memory;
            }
            match page.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }
    }
}
