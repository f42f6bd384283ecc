//! Change feed subscription over the store's snapshot primitive
//!
//! Wraps [`TaskStore::subscribe`] into a handler-driven feed: the handler
//! is invoked once with the complete current collection on subscribe, and
//! once per subsequent mutation. The returned [`Subscription`] is the
//! cancellation handle; after `unsubscribe()` returns, no suspension point
//! in the feed task will invoke the handler again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::{RawRecord, TaskStore};

/// Handle to an active change feed subscription
///
/// Cancellation is explicit via [`Subscription::unsubscribe`] and
/// idempotent; dropping the handle also cancels.
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Cancel the subscription
    ///
    /// Safe to call at any time and any number of times. Once called, the
    /// handler receives no further snapshots.
    pub fn unsubscribe(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
            debug!("Feed subscription cancelled");
        }
    }

    /// Whether the subscription has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Change feed over a task collection
pub struct ChangeFeed;

impl ChangeFeed {
    /// Subscribe to the store's snapshot feed
    ///
    /// The handler is called with the complete collection in store-native
    /// order: once immediately for the current state, then once per
    /// mutation. Delivery is monotonic in mutation order. Must be called
    /// within a tokio runtime.
    pub fn subscribe<F>(store: &TaskStore, mut handler: F) -> Subscription
    where
        F: FnMut(Vec<RawRecord>) + Send + 'static,
    {
        let (initial, mut rx) = store.subscribe();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let task = tokio::spawn(async move {
            if flag.load(Ordering::SeqCst) {
                return;
            }
            handler(initial);

            loop {
                match rx.recv().await {
                    Ok(snapshot) => {
                        // Re-check after the suspension point: a cancel that
                        // landed while we were parked must win.
                        if flag.load(Ordering::SeqCst) {
                            return;
                        }
                        handler(snapshot);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Snapshots are full-state, so skipping stale ones
                        // loses nothing: the next delivery is newer.
                        warn!(skipped, "Feed lagged behind mutation rate");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        });

        Subscription { cancelled, task }
    }
}
