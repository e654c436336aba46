use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::services::{MemoryService, SearchService, TimelineIndex, TimelineRetry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub timeline: Arc<TimelineIndex>,
    pub search: SearchService,
    pub memory: MemoryService,
}

impl AppState {
    /// Wire the services around `db`. Background retries stop when `shutdown` fires.
    pub fn new(config: Config, db: Arc<dyn DatabaseBackend>, shutdown: CancellationToken) -> Self {
        let config = Arc::new(config);
        let timeline = Arc::new(TimelineIndex::new(
            db.clone(),
            config.timeline.thumbnail_size,
            config.search.page_size,
        ));
        let search = SearchService::new(
            db.clone(),
            config.search.cache_size,
            config.search.page_size,
        );
        let retry = TimelineRetry::new(
            timeline.clone(),
            Duration::from_secs(config.timeline.retry_max_elapsed_secs),
            shutdown,
        );
        let memory = MemoryService::new(db.clone(), timeline.clone(), search.clone(), retry);

        Self {
            config,
            db,
            timeline,
            search,
            memory,
        }
    }
}
