//! Running-set accounting and the per-task failure boundary.

use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::stats::SchedulerCounters;
use super::{SchedulerError, TaskId, WorkItem};

/// Identifiers of in-flight tasks.
///
/// Only the admission loop inserts; only a [`RunningGuard`] removes.
#[derive(Debug, Default)]
pub struct RunningSet {
    ids: Mutex<HashSet<TaskId>>,
    /// Signalled after every removal.
    changed: Notify,
}

impl RunningSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of in-flight tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    /// True when nothing is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }

    /// Insert `id` if the set holds fewer than `ceiling` entries.
    ///
    /// Check and insert happen under one lock, so the ceiling holds even if
    /// this were called from several threads.
    pub(crate) fn try_admit(self: &Arc<Self>, id: TaskId, ceiling: usize) -> Option<RunningGuard> {
        let mut ids = self.ids.lock();
        if ids.len() >= ceiling {
            return None;
        }
        let fresh = ids.insert(id);
        assert!(fresh, "task {id} admitted twice");
        drop(ids);
        Some(RunningGuard {
            set: Arc::clone(self),
            id,
        })
    }

    /// Future that resolves on the next removal. Call `enable` on it before
    /// re-checking state to avoid missing a wakeup.
    pub(crate) fn changed(&self) -> tokio::sync::futures::Notified<'_> {
        self.changed.notified()
    }

    /// Wait until the set is empty.
    pub async fn drained(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn remove(&self, id: TaskId) {
        let removed = self.ids.lock().remove(&id);
        if !removed {
            error!(task_id = id, "running set lost track of task");
        }
        self.changed.notify_waiters();
    }
}

/// Membership handle for one running task. Dropping it removes the task
/// from the [`RunningSet`], whatever way the task ended.
#[derive(Debug)]
pub struct RunningGuard {
    set: Arc<RunningSet>,
    id: TaskId,
}

impl RunningGuard {
    /// Task this guard accounts for.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.set.remove(self.id);
    }
}

/// How a supervised task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Returned `Ok`.
    Succeeded,
    /// Returned `Err`.
    Failed(String),
    /// Panicked.
    Panicked(String),
}

/// Wrap `work` in the failure boundary.
///
/// The returned future never panics and never yields an error: failures are
/// logged with the task id and counted. The guard is held until the very end
/// so accounting is released only after the counters reflect the outcome.
pub(crate) fn supervise(
    guard: RunningGuard,
    work: WorkItem,
    cancel: CancellationToken,
    counters: Arc<SchedulerCounters>,
) -> impl Future<Output = ()> + Send + 'static {
    async move {
        let task_id = guard.id();
        let started = Instant::now();
        debug!(task_id, "task started");

        let outcome = run_isolated(work, cancel.clone()).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            TaskOutcome::Succeeded => {
                SchedulerCounters::incr(&counters.succeeded);
                debug!(task_id, elapsed_ms, "task completed");
            }
            TaskOutcome::Failed(reason) => {
                SchedulerCounters::incr(&counters.failed);
                let err = SchedulerError::TaskExecutionFailed { task_id, reason };
                error!(task_id, elapsed_ms, cancelled = cancel.is_cancelled(), error = %err, "task error");
            }
            TaskOutcome::Panicked(reason) => {
                SchedulerCounters::incr(&counters.panicked);
                let err = SchedulerError::TaskExecutionFailed { task_id, reason };
                error!(task_id, elapsed_ms, error = %err, "task panicked");
            }
        }
        drop(guard);
    }
}

/// Run a work item, converting errors and panics into a [`TaskOutcome`].
pub async fn run_isolated(work: WorkItem, cancel: CancellationToken) -> TaskOutcome {
    match AssertUnwindSafe(work.run(cancel)).catch_unwind().await {
        Ok(Ok(())) => TaskOutcome::Succeeded,
        Ok(Err(e)) => TaskOutcome::Failed(format!("{e:#}")),
        Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        warn!("task panicked with a non-string payload");
        "non-string panic payload".to_string()
    }
}
