//! Main SyncEngine - the authoritative view over the task collection
//!
//! SyncEngine is the sole subscriber of the change feed. For every snapshot
//! it parses the raw records, sorts them into view order, and publishes the
//! result under the active data mode:
//!
//! - [`DataMode::Direct`]: the sorted canonical tasks, published
//!   synchronously.
//! - [`DataMode::Api`]: the same tasks round-tripped through the remote
//!   task API shim, published when the fetch resolves.
//!
//! Every render is tagged with the engine epoch it was derived from. The
//! epoch advances on every snapshot, mode change and shutdown, and an API
//! fetch whose epoch is no longer current is discarded on completion -
//! last-snapshot-wins, never first-completed-wins.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::feed::{ChangeFeed, Subscription};
use crate::remote::RemoteApi;
use crate::store::{RawRecord, TaskStore};
use crate::types::{sort_view, Task};

/// Which representation the engine currently surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataMode {
    /// Serve records straight from the store feed
    #[default]
    Direct,
    /// Round-trip records through the remote task API schema
    Api,
}

impl std::fmt::Display for DataMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataMode::Direct => write!(f, "direct"),
            DataMode::Api => write!(f, "api"),
        }
    }
}

/// The published view: sorted tasks plus the mode they were rendered under
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskView {
    /// Mode this view was rendered under
    pub mode: DataMode,
    /// Tasks in view order
    pub tasks: Vec<Task>,
}

struct EngineState {
    mode: DataMode,
    /// Advances on every snapshot, mode change and shutdown; pending API
    /// fetches carry the epoch they were derived from
    epoch: u64,
    /// Last parsed and sorted snapshot
    tasks: Vec<Task>,
    closed: bool,
}

struct EngineInner {
    state: Mutex<EngineState>,
    view_tx: watch::Sender<TaskView>,
    remote: RemoteApi,
    subscription: Mutex<Option<Subscription>>,
}

/// Main entry point for Taskfeed
///
/// Bundles all mutable engine state (mode, last snapshot, published view)
/// behind one shared instance; clones are cheap handles to the same engine.
///
/// # Example
///
/// ```ignore
/// use taskfeed_core::{DataMode, SyncEngine, TaskStore};
///
/// let store = TaskStore::open("artifacts/app/public/data/tasks");
/// let engine = SyncEngine::new();
/// engine.start(&store);
///
/// let view = engine.subscribe_view();
/// engine.set_mode(DataMode::Api);
/// ```
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEngine {
    /// Create an engine with the default remote API shim
    pub fn new() -> Self {
        Self::with_remote(RemoteApi::default())
    }

    /// Create an engine with the given remote API shim
    pub fn with_remote(remote: RemoteApi) -> Self {
        let (view_tx, _) = watch::channel(TaskView::default());
        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState {
                    mode: DataMode::default(),
                    epoch: 0,
                    tasks: Vec::new(),
                    closed: false,
                }),
                view_tx,
                remote,
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Subscribe the engine to the store's change feed
    ///
    /// The engine is the feed's sole subscriber; the published view is
    /// updated only through snapshots arriving here. No-op if already
    /// started. Must be called within a tokio runtime.
    pub fn start(&self, store: &TaskStore) {
        let mut slot = self.inner.subscription.lock();
        if slot.is_some() {
            debug!("Engine already attached to a feed");
            return;
        }
        info!(path = %store.path(), "Attaching engine to change feed");
        let engine = self.clone();
        *slot = Some(ChangeFeed::subscribe(store, move |snapshot| {
            engine.on_snapshot(snapshot)
        }));
    }

    /// Tear the engine down
    ///
    /// Cancels the feed subscription and suppresses any publish still
    /// pending from an in-flight API fetch. Idempotent.
    pub fn shutdown(&self) {
        if let Some(sub) = self.inner.subscription.lock().take() {
            sub.unsubscribe();
        }
        let mut state = self.inner.state.lock();
        if !state.closed {
            state.closed = true;
            state.epoch += 1;
            info!("Engine shut down");
        }
    }

    /// Process one complete snapshot of the collection
    ///
    /// Parses each raw record into a task (malformed records are logged
    /// and skipped, never defaulted), sorts into view order, and renders
    /// under the current mode.
    pub fn on_snapshot(&self, records: Vec<RawRecord>) {
        let mut tasks = Vec::with_capacity(records.len());
        for record in &records {
            match record.to_task() {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(error = %e, "Skipping malformed record"),
            }
        }
        sort_view(&mut tasks);

        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.epoch += 1;
        state.tasks = tasks;
        debug!(
            count = state.tasks.len(),
            mode = %state.mode,
            epoch = state.epoch,
            "Snapshot received"
        );
        self.render_locked(&state);
    }

    /// Switch the surfaced representation
    ///
    /// The sole mutator of the mode. Setting the current value is a no-op.
    /// Switching re-renders the last known snapshot under the new mode -
    /// no fresh fetch from the backing store is triggered, and any API
    /// fetch still pending from the old epoch is discarded on completion.
    pub fn set_mode(&self, mode: DataMode) {
        let mut state = self.inner.state.lock();
        if state.closed || state.mode == mode {
            return;
        }
        state.mode = mode;
        state.epoch += 1;
        info!(%mode, epoch = state.epoch, "Data mode switched");
        self.render_locked(&state);
    }

    /// The currently active data mode
    pub fn mode(&self) -> DataMode {
        self.inner.state.lock().mode
    }

    /// The authoritative in-memory view: the last snapshot, parsed and
    /// sorted, independent of any pending API render
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.state.lock().tasks.clone()
    }

    /// Subscribe to the published view
    ///
    /// The receiver always holds the latest published view; consumers read
    /// it lazily and may restart iteration at any time.
    pub fn subscribe_view(&self) -> watch::Receiver<TaskView> {
        self.inner.view_tx.subscribe()
    }

    /// The latest published view
    pub fn view(&self) -> TaskView {
        self.inner.view_tx.borrow().clone()
    }

    /// Render the given state's snapshot under its mode
    ///
    /// Direct mode publishes synchronously while the state lock is held.
    /// API mode spawns the shim fetch, tagged with the state's epoch; the
    /// completion publishes only if that epoch is still current.
    fn render_locked(&self, state: &EngineState) {
        match state.mode {
            DataMode::Direct => {
                self.inner.view_tx.send_replace(TaskView {
                    mode: DataMode::Direct,
                    tasks: state.tasks.clone(),
                });
            }
            DataMode::Api => {
                let epoch = state.epoch;
                let tasks = state.tasks.clone();
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    let api_view = inner.remote.fetch_api_view(&tasks).await;
                    let tasks: Vec<Task> = api_view.into_iter().map(Task::from).collect();

                    let state = inner.state.lock();
                    if state.closed || state.epoch != epoch {
                        debug!(epoch, current = state.epoch, "Discarding stale API view");
                        return;
                    }
                    inner.view_tx.send_replace(TaskView {
                        mode: DataMode::Api,
                        tasks,
                    });
                });
            }
        }
    }
}
