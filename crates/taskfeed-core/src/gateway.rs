//! Mutation gateway: create / toggle / delete, write-through to the store
//!
//! The gateway keeps no task state of its own. Every operation writes
//! through to the backing store and returns only success or failure; the
//! published view catches up asynchronously through the change feed, which
//! is the only path that mutates it.
//!
//! Mutations are gated on the session boundary: until a stable owner id
//! has been supplied, the gateway is not ready and refuses to write.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{FeedError, FeedResult};
use crate::store::{task_fields, Fields, TaskStore, FIELD_COMPLETED};
use crate::types::TaskId;

/// Write-through gateway for task mutations
///
/// Cloning is cheap; clones share the owner session.
#[derive(Clone)]
pub struct MutationGateway {
    store: TaskStore,
    owner: Arc<RwLock<Option<String>>>,
}

impl MutationGateway {
    /// Create a gateway over the given store, with no owner session yet
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            owner: Arc::new(RwLock::new(None)),
        }
    }

    /// Supply the stable owner id for this session
    pub fn set_owner(&self, owner_id: impl Into<String>) {
        let owner_id = owner_id.into();
        debug!(%owner_id, "Session owner supplied");
        *self.owner.write() = Some(owner_id);
    }

    /// Whether a session owner has been supplied
    pub fn is_ready(&self) -> bool {
        self.owner.read().is_some()
    }

    /// The current session owner, if supplied
    pub fn owner(&self) -> Option<String> {
        self.owner.read().clone()
    }

    /// Create a new task
    ///
    /// The text is trimmed before writing; the store assigns the id and
    /// the gateway stamps the creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::SessionNotReady` if no owner id has been
    /// supplied, and `FeedError::Validation` if the trimmed text is empty -
    /// both rejected before any write is issued.
    pub fn create_task(&self, text: &str) -> FeedResult<TaskId> {
        let owner_id = self.owner().ok_or(FeedError::SessionNotReady)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedError::Validation("task text is empty".to_string()));
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let id = self
            .store
            .create(task_fields(text, false, &owner_id, created_at))?;
        debug!(task_id = %id, text, "Task created");
        Ok(id)
    }

    /// Flip a task's completion flag
    ///
    /// Writes the negation of the completion state the caller observed.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NotFound` if the task vanished concurrently -
    /// observed from the failing write itself, never pre-checked.
    pub fn toggle_task(&self, id: &TaskId, current_completed: bool) -> FeedResult<()> {
        if !self.is_ready() {
            return Err(FeedError::SessionNotReady);
        }
        let mut patch = Fields::new();
        patch.insert(FIELD_COMPLETED.to_string(), Value::from(!current_completed));
        self.store.update(id, patch)?;
        debug!(task_id = %id, completed = !current_completed, "Task toggled");
        Ok(())
    }

    /// Remove a task
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NotFound` if the task vanished concurrently.
    pub fn delete_task(&self, id: &TaskId) -> FeedResult<()> {
        if !self.is_ready() {
            return Err(FeedError::SessionNotReady);
        }
        self.store.delete(id)?;
        debug!(task_id = %id, "Task deleted");
        Ok(())
    }
}
