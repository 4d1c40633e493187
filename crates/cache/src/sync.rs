//! Periodic background synchronization of a [`NoteCache`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mcp_notesync_core::NoteStore;

use crate::cache::NoteCache;

/// Floor for the shortened delay used after a failed sync, so a flapping
/// remote cannot drive the loop hot.
const FAILURE_BACKOFF_FLOOR: Duration = Duration::from_secs(5);

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives `cache.sync()` on an interval until stopped. One loop per cache
/// instance; failures are logged and retried sooner, never fatal.
pub struct BackgroundSync<S> {
    cache: Arc<NoteCache<S>>,
    interval: Duration,
    worker: Mutex<Option<Worker>>,
}

impl<S: NoteStore + 'static> BackgroundSync<S> {
    pub fn new(cache: Arc<NoteCache<S>>) -> Self {
        let interval = cache.config().sync_interval;
        Self {
            cache,
            interval,
            worker: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Spawn the sync loop. A second call while the loop is alive is a
    /// logged no-op.
    pub fn start(&self) {
        let mut slot = self.worker.lock();
        if slot
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
        {
            warn!("background sync task is already running");
            return;
        }

        let cache = Arc::clone(&self.cache);
        let interval = self.interval;
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        info!(
            interval_secs = interval.as_secs(),
            "starting background sync task"
        );
        let handle = tokio::spawn(async move {
            let mut last_failed = false;
            loop {
                let delay = next_delay(interval, last_failed);
                tokio::select! {
                    _ = loop_cancel.cancelled() => {
                        debug!("background sync loop cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                // Only the sleep is cancellable: a sync already under way
                // runs to completion and the loop exits at the next wait.
                match cache.sync().await {
                    Ok(touched) => {
                        last_failed = false;
                        if touched > 0 {
                            info!(touched, "background sync applied changes");
                        } else {
                            debug!("background sync found no changes");
                        }
                    }
                    Err(err) => {
                        last_failed = true;
                        warn!(error = %err, "background sync failed; will retry sooner");
                    }
                }
            }
        });
        *slot = Some(Worker { cancel, handle });
    }

    /// Cancel the loop and wait for the in-flight iteration to finish.
    /// Idempotent: stopping a stopped synchronizer is a no-op.
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        match worker {
            Some(worker) => {
                worker.cancel.cancel();
                if let Err(err) = worker.handle.await {
                    warn!(error = %err, "background sync task did not exit cleanly");
                }
                info!("stopped background sync task");
            }
            None => debug!("background sync task is not running"),
        }
    }
}

/// Normal cadence on success; after a failure, half the interval clamped to
/// a floor, so transient outages self-heal faster without hot-looping.
fn next_delay(interval: Duration, last_failed: bool) -> Duration {
    if last_failed {
        (interval / 2).max(FAILURE_BACKOFF_FLOOR)
    } else {
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_keeps_the_normal_interval() {
        let interval = Duration::from_secs(120);
        assert_eq!(next_delay(interval, false), interval);
    }

    #[test]
    fn failure_halves_the_interval() {
        let interval = Duration::from_secs(120);
        assert_eq!(next_delay(interval, true), Duration::from_secs(60));
    }

    #[test]
    fn failure_backoff_is_floor_clamped() {
        let interval = Duration::from_secs(6);
        assert_eq!(next_delay(interval, true), FAILURE_BACKOFF_FLOOR);
    }
}
