//! Schema translation between canonical tasks and the task API wire form
//!
//! The API represents completion as a `PENDING`/`DONE` status and creation
//! time as `timestamp`. The mapping is a bijection: round-tripping a task
//! through either direction yields a value equal in all fields.

use serde::{Deserialize, Serialize};

use crate::types::{Task, TaskId};

/// Completion status in the task API schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is not yet completed
    Pending,
    /// Task is completed
    Done,
}

impl TaskStatus {
    /// Decode the status into the canonical completed flag
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl From<bool> for TaskStatus {
    fn from(completed: bool) -> Self {
        if completed {
            TaskStatus::Done
        } else {
            TaskStatus::Pending
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Done => write!(f, "DONE"),
        }
    }
}

/// Task as the remote API represents it (alternate form)
///
/// Isomorphic to [`Task`]: `status` carries `completed`, `timestamp`
/// carries `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTask {
    /// Same identifier as the canonical task
    pub id: TaskId,
    /// Task text, unchanged by translation
    pub text: String,
    /// Completion status
    pub status: TaskStatus,
    /// Id of the session that created the task
    pub owner_id: String,
    /// Unix timestamp of creation in milliseconds
    pub timestamp: i64,
}

impl From<Task> for ApiTask {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            text: task.text,
            status: TaskStatus::from(task.completed),
            owner_id: task.owner_id,
            timestamp: task.created_at,
        }
    }
}

impl From<ApiTask> for Task {
    fn from(api: ApiTask) -> Self {
        Self {
            id: api.id,
            text: api.text,
            completed: api.status.is_done(),
            owner_id: api.owner_id,
            created_at: api.timestamp,
        }
    }
}
