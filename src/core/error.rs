//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

use super::TaskId;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Pending queue is at capacity and the overflow policy rejects.
    #[error("queue full: capacity {capacity} reached")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
    /// Pending queue stayed full for the whole back-pressure wait.
    #[error("submission timed out after {0:?} waiting for queue space")]
    SubmitTimeout(Duration),
    /// Scheduler no longer accepts work.
    #[error("scheduler is shutting down")]
    ShuttingDown,
    /// Admission loop was already started.
    #[error("admission loop already started")]
    AlreadyStarted,
    /// Running tasks did not drain within the grace period.
    #[error("shutdown timed out with {remaining} task(s) still running")]
    ShutdownTimedOut {
        /// Tasks still running when the grace period elapsed.
        remaining: usize,
    },
    /// A task's computation failed. Only ever logged, never returned to callers.
    #[error("task {task_id} failed: {reason}")]
    TaskExecutionFailed {
        /// Identifier of the failed task.
        task_id: TaskId,
        /// Failure description.
        reason: String,
    },
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The admission loop itself panicked.
    #[error("admission loop panicked: {0}")]
    LoopPanicked(String),
}

impl SchedulerError {
    /// True for the fail-fast rejection surfaced by `submit`.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::SubmitTimeout(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
