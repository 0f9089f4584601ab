//! Core scheduling abstractions: work items, pending queue, running set,
//! task supervision, and the admission loop.

pub mod error;
pub mod job;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod supervisor;

pub use error::{AppResult, SchedulerError};
pub use job::{CancellableJob, FutureJob, Job, TaskId, WorkItem};
pub use queue::{PendingQueue, PendingTask, PushError};
pub use scheduler::{Spawn, TaskScheduler};
pub use stats::SchedulerStats;
pub use supervisor::{run_isolated, RunningGuard, RunningSet, TaskOutcome};
pub use tokio_util::sync::CancellationToken;
