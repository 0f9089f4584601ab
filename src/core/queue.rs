//! FIFO pending queue with optional capacity.
//!
//! Insertion may happen from any thread; removal happens only from the
//! admission loop (or [`PendingQueue::close`] at shutdown). A single
//! `parking_lot::Mutex` guards the deque and the closed flag so that a push
//! can never slip in after the queue has been drained for shutdown.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{TaskId, WorkItem};

/// Work item waiting for admission, tagged with its sequence number.
pub struct PendingTask {
    /// Sequence number assigned at submission.
    pub id: TaskId,
    /// The deferred computation.
    pub work: WorkItem,
}

impl std::fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTask").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Why a push did not enqueue.
#[derive(Debug)]
pub enum PushError {
    /// Queue at capacity; the task is handed back.
    Full(PendingTask),
    /// Queue closed for shutdown.
    Closed,
}

struct Inner {
    items: VecDeque<PendingTask>,
    closed: bool,
}

/// Ordered sequence of work awaiting admission.
pub struct PendingQueue {
    inner: Mutex<Inner>,
    capacity: Option<usize>,
    /// Signalled whenever a slot frees up or the queue closes.
    space: Notify,
}

impl PendingQueue {
    /// Create a queue; `None` means unbounded.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.unwrap_or(16).min(1024)),
                closed: false,
            }),
            capacity,
            space: Notify::new(),
        }
    }

    /// Configured capacity, if bounded.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append at the tail without waiting.
    ///
    /// # Errors
    ///
    /// [`PushError::Full`] at capacity, [`PushError::Closed`] after close.
    pub fn try_push(&self, task: PendingTask) -> Result<(), PushError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(PushError::Closed);
        }
        if let Some(cap) = self.capacity {
            if inner.items.len() >= cap {
                return Err(PushError::Full(task));
            }
        }
        inner.items.push_back(task);
        Ok(())
    }

    /// Append at the tail, suspending until a slot frees up.
    ///
    /// Returns the task back if the queue is still full when `timeout`
    /// elapses.
    ///
    /// # Errors
    ///
    /// Same as [`PendingQueue::try_push`], after the wait.
    pub async fn push_wait(
        &self,
        mut task: PendingTask,
        timeout: std::time::Duration,
    ) -> Result<(), PushError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before retrying so a pop between the retry and
            // the await cannot be missed.
            let notified = self.space.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_push(task) {
                Err(PushError::Full(back)) => task = back,
                other => return other,
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_push(task);
            }
        }
    }

    /// Remove and return the head.
    pub fn pop(&self) -> Option<PendingTask> {
        let task = self.inner.lock().items.pop_front();
        if task.is_some() {
            self.space.notify_one();
        }
        task
    }

    /// Close the queue and discard everything still pending.
    ///
    /// Returns the number of discarded items. Closing twice is harmless.
    pub fn close(&self) -> usize {
        let discarded: Vec<PendingTask> = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.items.drain(..).collect()
        };
        self.space.notify_waiters();
        // Dropped outside the lock: a job's destructor may do arbitrary work.
        discarded.len()
    }

    /// Number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// True once [`PendingQueue::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}
