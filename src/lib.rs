//! # Background Task Scheduler
//!
//! A bounded-concurrency scheduler for background work: callers submit
//! opaque async computations, a single admission loop runs at most
//! `max_concurrent_tasks` of them at a time in FIFO order, each task is
//! isolated behind a failure boundary, and shutdown drains in-flight work.
//!
//! ## Guarantees
//!
//! - **Bounded concurrency**: the running set never exceeds the ceiling
//! - **FIFO admission**: pending work is admitted strictly in submission order
//! - **Failure isolation**: a task's error or panic is logged and counted,
//!   never propagated to the loop or to sibling tasks
//! - **Exact accounting**: each admitted task leaves the running set exactly
//!   once, however it ends
//! - **Event-driven**: the loop wakes on submission, completion, or shutdown;
//!   it never busy-polls
//! - **Graceful shutdown**: cooperative cancellation, bounded drain, idempotent
//!
//! ## Non-goals
//!
//! Pending work is not persisted across restarts, there are no priorities,
//! and failed tasks are not retried. Submission is fire-and-forget: a caller
//! that needs a result carries its own channel into the job.
//!
//! ```rust,ignore
//! use background_task_scheduler::builders::build_scheduler;
//! use background_task_scheduler::config::SchedulerConfig;
//! use std::time::Duration;
//!
//! let scheduler = build_scheduler(
//!     &SchedulerConfig::new()
//!         .with_max_concurrent_tasks(3)
//!         .with_queue_capacity(100)
//!         .with_shutdown_timeout(Duration::from_secs(10)),
//! )?;
//! scheduler.start()?;
//!
//! scheduler
//!     .submit_cancellable(move |cancel| async move {
//!         tokio::select! {
//!             () = cancel.cancelled() => Ok(()),
//!             res = learn_new_topics(agent_id) => res,
//!         }
//!     })
//!     .await?;
//!
//! // At process teardown:
//! if let Err(e) = scheduler.shutdown().await {
//!     tracing::warn!(error = %e, "scheduler shutdown incomplete");
//! }
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and running-task accounting.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::config::{OverflowPolicy, SchedulerConfig};
pub use crate::core::{SchedulerError, SchedulerStats, TaskId, TaskScheduler};
