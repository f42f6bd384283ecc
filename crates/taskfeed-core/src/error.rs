//! Error types for Taskfeed

use thiserror::Error;

/// Main error type for Taskfeed operations
#[derive(Error, Debug)]
pub enum FeedError {
    /// Input rejected before any write was issued
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Mutation target no longer exists in the backing store
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Raw record could not be mapped into a task
    #[error("Translation error: {0}")]
    Translation(String),

    /// Error during backing store operations
    #[error("Store error: {0}")]
    Store(String),

    /// No session owner has been supplied yet; mutations are not allowed
    #[error("Session not ready: no owner id supplied")]
    SessionNotReady,
}

/// Result type alias using FeedError
pub type FeedResult<T> = Result<T, FeedError>;
