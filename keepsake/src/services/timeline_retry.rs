use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::TimelineIndex;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);

/// Background re-application of timeline rebuilds that failed inline.
#[derive(Clone)]
pub struct TimelineRetry {
    timeline: Arc<TimelineIndex>,
    max_elapsed: Duration,
    initial_interval: Duration,
    token: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

impl TimelineRetry {
    pub fn new(timeline: Arc<TimelineIndex>, max_elapsed: Duration, token: CancellationToken) -> Self {
        Self {
            timeline,
            max_elapsed,
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            token,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Number of ids still being retried.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Retry `rebuild_entry(id)` with exponential backoff until it succeeds,
    /// the retry window closes or shutdown begins.
    pub fn schedule(&self, id: String) {
        let timeline = Arc::clone(&self.timeline);
        let token = self.token.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let policy = ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        in_flight.fetch_add(1, Ordering::AcqRel);
        tokio::spawn(async move {
            let operation = || {
                let timeline = Arc::clone(&timeline);
                let id = id.clone();
                async move {
                    timeline.rebuild_entry(&id).await.map_err(|e| {
                        warn!(id = %id, error = %e, "Timeline rebuild attempt failed");
                        backoff::Error::transient(e)
                    })
                }
            };

            tokio::select! {
                _ = token.cancelled() => {
                    debug!(id = %id, "Timeline retry cancelled by shutdown");
                }
                outcome = backoff::future::retry(policy, operation) => match outcome {
                    Ok(()) => info!(id = %id, "Timeline entry rebuilt after retry"),
                    Err(e) => error!(id = %id, error = %e, "Giving up on timeline rebuild"),
                }
            }

            in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }
}
