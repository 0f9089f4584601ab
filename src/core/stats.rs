//! Scheduler statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SchedulerStats {
    /// Concurrency ceiling.
    pub max_concurrent_tasks: usize,

    /// Tasks currently executing.
    pub running_tasks: usize,

    /// Tasks waiting for admission.
    pub pending_tasks: usize,

    /// Total tasks accepted by `submit`.
    pub submitted_tasks: u64,

    /// Total submissions rejected (queue full or wait timeout).
    pub rejected_tasks: u64,

    /// Total tasks promoted to running.
    pub admitted_tasks: u64,

    /// Total tasks that returned `Ok`.
    pub succeeded_tasks: u64,

    /// Total tasks that returned `Err`.
    pub failed_tasks: u64,

    /// Total tasks that panicked.
    pub panicked_tasks: u64,

    /// Pending tasks discarded at shutdown without running.
    pub discarded_tasks: u64,
}

impl SchedulerStats {
    /// Tasks that finished by any means.
    #[must_use]
    pub const fn finished_tasks(&self) -> u64 {
        self.succeeded_tasks + self.failed_tasks + self.panicked_tasks
    }
}

/// Internal counters (lock-free atomics).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub rejected: AtomicU64,
    pub admitted: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub panicked: AtomicU64,
    pub discarded: AtomicU64,
}

impl SchedulerCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot counters, combined with the live gauges supplied by the caller.
    pub fn snapshot(&self, max_concurrent_tasks: usize, running: usize, pending: usize) -> SchedulerStats {
        SchedulerStats {
            max_concurrent_tasks,
            running_tasks: running,
            pending_tasks: pending,
            submitted_tasks: self.submitted.load(Ordering::Relaxed),
            rejected_tasks: self.rejected.load(Ordering::Relaxed),
            admitted_tasks: self.admitted.load(Ordering::Relaxed),
            succeeded_tasks: self.succeeded.load(Ordering::Relaxed),
            failed_tasks: self.failed.load(Ordering::Relaxed),
            panicked_tasks: self.panicked.load(Ordering::Relaxed),
            discarded_tasks: self.discarded.load(Ordering::Relaxed),
        }
    }
}
