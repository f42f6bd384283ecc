//! Core types for Taskfeed

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a task
///
/// Assigned by the backing store at creation time and immutable thereafter.
/// Uses ULID for time-ordered unique identifiers that sort lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub Ulid);

impl TaskId {
    /// Create a new TaskId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Get the underlying ULID
    pub fn as_ulid(&self) -> &Ulid {
        &self.0
    }

    /// Parse from string representation
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        let ulid = Ulid::from_string(s)?;
        Ok(Self(ulid))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task in the shared collection (canonical form)
///
/// `id`, `owner_id` and `created_at` are immutable after creation;
/// only `text` and `completed` may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, assigned by the backing store
    pub id: TaskId,
    /// Task text, non-empty after trimming
    pub text: String,
    /// Whether the task is completed
    pub completed: bool,
    /// Id of the session that created the task
    pub owner_id: String,
    /// Unix timestamp of creation in milliseconds; sole sort key of the view
    pub created_at: i64,
}

impl Task {
    /// Create a new task with the given text and owner
    pub fn new(text: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            text: text.into(),
            completed: false,
            owner_id: owner_id.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// View ordering: `created_at` ascending, ties broken by id
    pub fn view_order(&self, other: &Task) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sort tasks into view order
pub fn sort_view(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.view_order(b));
}
