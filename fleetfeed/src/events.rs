//! Delivery sink: the consumer-facing event surface.
//!
//! Two typed listener collections, one per event kind. Every snapshot batch
//! reaches the same listeners no matter which transport produced it, and a
//! panicking listener never blocks the others.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;

use crate::status::TransportStatus;
use crate::types::ServerSnapshot;

type SnapshotListener = Arc<dyn Fn(&[ServerSnapshot]) + Send + Sync>;
type StatusListener = Arc<dyn Fn(TransportStatus) + Send + Sync>;

/// Fan-out point for feed events.
#[derive(Default)]
pub struct FeedEvents {
    snapshot_listeners: Mutex<Vec<SnapshotListener>>,
    status_listeners: Mutex<Vec<StatusListener>>,
}

impl FeedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for snapshot batches.
    pub fn on_snapshots<F>(&self, listener: F)
    where
        F: Fn(&[ServerSnapshot]) + Send + Sync + 'static,
    {
        self.snapshot_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Register a listener for transport-status transitions.
    pub fn on_connection_change<F>(&self, listener: F)
    where
        F: Fn(TransportStatus) + Send + Sync + 'static,
    {
        self.status_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Remove every registered listener.
    pub fn clear(&self) {
        self.snapshot_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.status_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub(crate) fn emit_snapshots(&self, batch: &[ServerSnapshot]) {
        // snapshot the registrations so listeners run without the lock held
        let listeners = self
            .snapshot_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(batch))).is_err() {
                error!("snapshot listener panicked; continuing with the rest");
            }
        }
    }

    pub(crate) fn emit_status(&self, status: TransportStatus) {
        let listeners = self
            .status_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                error!("connection-change listener panicked; continuing with the rest");
            }
        }
    }
}
