//! HTTP poll loop: periodic snapshot fetches, independent of the channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::api::SnapshotFetcher;
use crate::events::FeedEvents;
use crate::report::ErrorSink;

/// Periodic pull source. Started and stopped only by the coordinator, so a
/// second timer can never appear. A failed fetch is reported and the loop
/// carries on; only `stop` ends it.
pub struct PollLoop {
    period: Duration,
    fetcher: Arc<dyn SnapshotFetcher>,
    events: Arc<FeedEvents>,
    sink: Arc<dyn ErrorSink>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollLoop {
    pub fn new(
        period: Duration,
        fetcher: Arc<dyn SnapshotFetcher>,
        events: Arc<FeedEvents>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            period,
            fetcher,
            events,
            sink,
            task: Mutex::new(None),
        }
    }

    /// Fetch once and hand the batch to the sink.
    pub async fn fetch_once(&self) {
        fetch_and_deliver(&*self.fetcher, &self.events, &*self.sink).await;
    }

    /// Start polling. Any previous loop is stopped first so there is never
    /// more than one timer. `skip_first_fetch` suppresses the immediate
    /// fetch when the caller has just performed one itself.
    pub fn start(&self, skip_first_fetch: bool) {
        self.stop();
        let period = self.period;
        let fetcher = Arc::clone(&self.fetcher);
        let events = Arc::clone(&self.events);
        let sink = Arc::clone(&self.sink);
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            // a slow fetch delays the next tick instead of stacking fetches
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if skip_first_fetch {
                timer.tick().await;
            }
            loop {
                timer.tick().await;
                fetch_and_deliver(&*fetcher, &events, &*sink).await;
            }
        });
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        debug!(period_ms = period.as_millis() as u64, "poll loop started");
    }

    /// Stop polling. The timer task is aborted before this returns, so no
    /// further tick can fire. Idempotent.
    pub fn stop(&self) {
        if let Some(handle) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            debug!("poll loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn fetch_and_deliver(fetcher: &dyn SnapshotFetcher, events: &FeedEvents, sink: &dyn ErrorSink) {
    match fetcher.fetch().await {
        Ok(batch) => events.emit_snapshots(&batch),
        Err(e) => sink.report("fetch server status", &e),
    }
}
