//! Bounded-concurrency task scheduler.
//!
//! Work submitted through [`TaskScheduler::submit`] lands in a FIFO
//! [`PendingQueue`]. A single admission loop promotes the queue head into a
//! running task whenever the [`RunningSet`] is below the configured ceiling.
//! The loop is event-driven: it sleeps until a submission arrives, a running
//! task finishes, or shutdown is requested.
//!
//! Submission is fire-and-forget. `submit` reports only whether the item was
//! queued; the task's own success or failure is logged and counted, never
//! returned.
//!
//! # Example
//!
//! ```rust,ignore
//! use background_task_scheduler::builders::build_scheduler;
//! use background_task_scheduler::config::SchedulerConfig;
//!
//! let scheduler = build_scheduler(&SchedulerConfig::new().with_max_concurrent_tasks(2))?;
//! scheduler.start()?;
//! scheduler.submit(async { refresh_knowledge_base(7).await }).await?;
//! // ...
//! scheduler.shutdown().await?;
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{OverflowPolicy, SchedulerConfig};

use super::queue::{PendingQueue, PendingTask, PushError};
use super::stats::{SchedulerCounters, SchedulerStats};
use super::supervisor::{supervise, RunningSet};
use super::{CancellableJob, FutureJob, SchedulerError, TaskId, WorkItem};

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// State shared between the handle, the admission loop, and running tasks.
struct Shared {
    config: SchedulerConfig,
    queue: PendingQueue,
    running: Arc<RunningSet>,
    counters: Arc<SchedulerCounters>,
    /// Signalled on every successful submission.
    submitted: Notify,
    /// Shutdown signal. Each running task receives a child token.
    cancel: CancellationToken,
    /// Grace period override for the current shutdown.
    grace: Mutex<Option<Duration>>,
    next_id: AtomicU64,
}

/// What the admission loop reports when it terminates.
#[derive(Debug)]
struct LoopExit {
    /// Tasks still running when the grace period elapsed.
    remaining: usize,
}

enum LoopState {
    NotStarted,
    Running(oneshot::Receiver<LoopExit>),
    Terminated,
}

/// Bounded-concurrency background task scheduler.
///
/// Construct one per process and pass it (usually behind an `Arc`) to
/// whatever needs to submit work. Call [`TaskScheduler::start`] once at
/// startup and [`TaskScheduler::shutdown`] once at teardown.
pub struct TaskScheduler<S> {
    shared: Arc<Shared>,
    spawner: S,
    state: Mutex<LoopState>,
}

impl<S> TaskScheduler<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a scheduler. The admission loop is not running until
    /// [`TaskScheduler::start`] is called; work submitted before that waits.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: SchedulerConfig, spawner: S) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        info!(
            max_concurrent_tasks = config.max_concurrent_tasks,
            queue_capacity = ?config.queue_capacity,
            overflow = ?config.overflow,
            "task scheduler initialized"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                queue: PendingQueue::new(config.queue_capacity),
                running: Arc::new(RunningSet::new()),
                counters: Arc::new(SchedulerCounters::default()),
                submitted: Notify::new(),
                cancel: CancellationToken::new(),
                grace: Mutex::new(None),
                next_id: AtomicU64::new(1),
                config,
            }),
            spawner,
            state: Mutex::new(LoopState::NotStarted),
        })
    }

    /// Start the admission loop.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::AlreadyStarted` on a second call
    /// - `SchedulerError::ShuttingDown` after shutdown
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        match *state {
            LoopState::NotStarted => {}
            LoopState::Running(_) => return Err(SchedulerError::AlreadyStarted),
            LoopState::Terminated => return Err(SchedulerError::ShuttingDown),
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.spawner.spawn(admission_loop(
            Arc::clone(&self.shared),
            self.spawner.clone(),
            done_tx,
        ));
        *state = LoopState::Running(done_rx);
        info!("admission loop started");
        Ok(())
    }

    /// Queue a future for execution. The future does not observe
    /// cancellation and always runs to completion once admitted.
    ///
    /// # Errors
    ///
    /// See [`TaskScheduler::submit_job`].
    pub async fn submit<F>(&self, fut: F) -> Result<TaskId, SchedulerError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.submit_job(Box::new(FutureJob::new(fut))).await
    }

    /// Queue a closure that receives the shutdown cancellation token.
    ///
    /// # Errors
    ///
    /// See [`TaskScheduler::submit_job`].
    pub async fn submit_cancellable<F, Fut>(&self, make: F) -> Result<TaskId, SchedulerError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.submit_job(Box::new(CancellableJob::new(make))).await
    }

    /// Queue a boxed job, applying the configured overflow policy.
    ///
    /// Suspends only under [`OverflowPolicy::Wait`] with a full queue.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::QueueFull` if the queue is full under `Reject`
    /// - `SchedulerError::SubmitTimeout` if it stayed full for the whole wait
    /// - `SchedulerError::ShuttingDown` once shutdown has begun
    pub async fn submit_job(&self, work: WorkItem) -> Result<TaskId, SchedulerError> {
        match self.shared.config.overflow {
            OverflowPolicy::Reject => self.try_submit_job(work),
            OverflowPolicy::Wait { timeout_ms } => {
                let timeout = Duration::from_millis(timeout_ms);
                let task = self.prepare(work)?;
                let id = task.id;
                let res = self.shared.queue.push_wait(task, timeout).await;
                self.finish_submit(id, res, SchedulerError::SubmitTimeout(timeout))
            }
        }
    }

    /// Queue a boxed job without ever waiting, whatever the overflow policy.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::QueueFull` if the queue is full
    /// - `SchedulerError::ShuttingDown` once shutdown has begun
    pub fn try_submit_job(&self, work: WorkItem) -> Result<TaskId, SchedulerError> {
        let task = self.prepare(work)?;
        let id = task.id;
        let res = self.shared.queue.try_push(task);
        let capacity = self.shared.queue.capacity().unwrap_or_default();
        self.finish_submit(id, res, SchedulerError::QueueFull { capacity })
    }

    fn prepare(&self, work: WorkItem) -> Result<PendingTask, SchedulerError> {
        if self.shared.cancel.is_cancelled() {
            return Err(SchedulerError::ShuttingDown);
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(PendingTask { id, work })
    }

    fn finish_submit(
        &self,
        id: TaskId,
        res: Result<(), PushError>,
        full: SchedulerError,
    ) -> Result<TaskId, SchedulerError> {
        match res {
            Ok(()) => {
                SchedulerCounters::incr(&self.shared.counters.submitted);
                debug!(task_id = id, pending = self.shared.queue.len(), "task queued");
                self.shared.submitted.notify_one();
                Ok(id)
            }
            Err(PushError::Full(_)) => {
                SchedulerCounters::incr(&self.shared.counters.rejected);
                warn!(task_id = id, error = %full, "task rejected");
                Err(full)
            }
            Err(PushError::Closed) => Err(SchedulerError::ShuttingDown),
        }
    }

    /// Shut down using the configured grace period.
    ///
    /// # Errors
    ///
    /// See [`TaskScheduler::shutdown_with_grace`].
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.shutdown_inner(self.shared.config.shutdown_timeout()).await
    }

    /// Stop admitting work, discard anything still pending, cancel running
    /// tasks, and wait up to `grace` for them to finish.
    ///
    /// Tasks that ignore cancellation are never aborted; past the grace
    /// period they are abandoned to finish on their own. Calling this again
    /// after the loop has terminated is a no-op.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::ShutdownTimedOut` if tasks were still running when
    ///   the grace period elapsed; treat it as a warning
    /// - `SchedulerError::LoopPanicked` if the admission loop died
    pub async fn shutdown_with_grace(&self, grace: Duration) -> Result<(), SchedulerError> {
        self.shutdown_inner(Some(grace)).await
    }

    async fn shutdown_inner(&self, grace: Option<Duration>) -> Result<(), SchedulerError> {
        let previous = std::mem::replace(&mut *self.state.lock(), LoopState::Terminated);
        let done_rx = match previous {
            LoopState::Terminated => {
                debug!("shutdown requested again; already terminated");
                return Ok(());
            }
            LoopState::NotStarted => None,
            LoopState::Running(rx) => Some(rx),
        };

        info!(
            running = self.shared.running.len(),
            pending = self.shared.queue.len(),
            grace_ms = ?grace.map(|g| g.as_millis()),
            "task scheduler shutting down"
        );

        *self.shared.grace.lock() = grace;
        self.shared.cancel.cancel();
        discard_pending(&self.shared);

        let Some(done_rx) = done_rx else {
            info!("task scheduler shut down (loop never started)");
            return Ok(());
        };

        match done_rx.await {
            Ok(LoopExit { remaining: 0 }) => {
                info!("task scheduler shut down");
                Ok(())
            }
            Ok(LoopExit { remaining }) => Err(SchedulerError::ShutdownTimedOut { remaining }),
            Err(_) => {
                error!("admission loop terminated without reporting");
                Err(SchedulerError::LoopPanicked("admission loop dropped its exit channel".into()))
            }
        }
    }

    /// Tasks currently executing.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.shared.running.len()
    }

    /// Tasks waiting for admission.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// True once shutdown has begun.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Configuration the scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Token cancelled when shutdown begins; handy for tying other
    /// background work to the scheduler's lifetime.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shared.cancel.child_token()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.shared.counters.snapshot(
            self.shared.config.max_concurrent_tasks,
            self.shared.running.len(),
            self.shared.queue.len(),
        )
    }
}

impl<S> Drop for TaskScheduler<S> {
    fn drop(&mut self) {
        // Signal but never wait here; explicit shutdown() is required for draining.
        if !self.shared.cancel.is_cancelled() {
            self.shared.cancel.cancel();
            discard_pending(&self.shared);
            debug!("task scheduler dropped without explicit shutdown");
        }
    }
}

fn discard_pending(shared: &Shared) {
    let discarded = shared.queue.close();
    if discarded > 0 {
        shared
            .counters
            .discarded
            .fetch_add(discarded as u64, Ordering::Relaxed);
        warn!(discarded, "discarded pending tasks at shutdown");
    }
}

/// Admission loop: promote queued work while below the ceiling, then sleep
/// until something changes. On cancellation, drain running tasks.
async fn admission_loop<S>(shared: Arc<Shared>, spawner: S, done: oneshot::Sender<LoopExit>)
where
    S: Spawn + Send + 'static,
{
    let ceiling = shared.config.max_concurrent_tasks;
    let poll = shared.config.poll_interval();

    loop {
        // Register for both wakeups before inspecting state.
        let submitted = shared.submitted.notified();
        let changed = shared.running.changed();
        tokio::pin!(submitted, changed);
        submitted.as_mut().enable();
        changed.as_mut().enable();

        if shared.cancel.is_cancelled() {
            break;
        }

        while shared.running.len() < ceiling && !shared.cancel.is_cancelled() {
            let Some(task) = shared.queue.pop() else {
                break;
            };
            // Only this loop adds to the running set, so a slot seen free
            // above is still free.
            let Some(guard) = shared.running.try_admit(task.id, ceiling) else {
                error!(task_id = task.id, "admission invariant violated");
                panic!("running set full after a free slot was observed");
            };
            SchedulerCounters::incr(&shared.counters.admitted);
            debug!(task_id = task.id, running = shared.running.len(), "task admitted");
            spawner.spawn(supervise(
                guard,
                task.work,
                shared.cancel.child_token(),
                Arc::clone(&shared.counters),
            ));
        }

        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            () = submitted.as_mut() => {}
            () = changed.as_mut() => {}
            () = sleep_or_never(poll) => {}
        }
    }

    let grace = shared.grace.lock().take();
    let running = shared.running.len();
    info!(running, "admission loop stopped; draining running tasks");

    let remaining = match grace {
        Some(grace) => match tokio::time::timeout(grace, shared.running.drained()).await {
            Ok(()) => 0,
            Err(_) => {
                let remaining = shared.running.len();
                warn!(
                    remaining,
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "shutdown grace period elapsed; abandoning running tasks"
                );
                remaining
            }
        },
        None => {
            shared.running.drained().await;
            0
        }
    };

    info!(remaining, "admission loop terminated");
    let _ = done.send(LoopExit { remaining });
}

async fn sleep_or_never(period: Option<Duration>) {
    match period {
        Some(period) => tokio::time::sleep(period).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Clone)]
    struct TokioSpawn;

    impl Spawn for TokioSpawn {
        fn spawn<F>(&self, fut: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            tokio::spawn(fut);
        }
    }

    fn scheduler(config: SchedulerConfig) -> TaskScheduler<TokioSpawn> {
        TaskScheduler::new(config, TokioSpawn).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let res = TaskScheduler::new(SchedulerConfig::new().with_max_concurrent_tasks(0), TokioSpawn);
        assert!(matches!(res, Err(SchedulerError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let s = scheduler(SchedulerConfig::new());
        s.start().unwrap();
        assert!(matches!(s.start(), Err(SchedulerError::AlreadyStarted)));
        s.shutdown().await.unwrap();
        assert!(matches!(s.start(), Err(SchedulerError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_task_ids_are_sequential() {
        let s = scheduler(SchedulerConfig::new());
        let a = s.submit(async { Ok(()) }).await.unwrap();
        let b = s.submit(async { Ok(()) }).await.unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(s.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_discards_pending() {
        let ran = Arc::new(AtomicUsize::new(0));
        let s = scheduler(SchedulerConfig::new());
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            s.submit(async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        }

        s.shutdown().await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(s.stats().discarded_tasks, 3);
        assert_eq!(s.pending_count(), 0);
        assert!(matches!(
            s.submit(async { Ok(()) }).await,
            Err(SchedulerError::ShuttingDown)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_policy_times_out() {
        let s = scheduler(
            SchedulerConfig::new()
                .with_queue_capacity(1)
                .with_overflow(OverflowPolicy::Wait { timeout_ms: 20 }),
        );
        // Loop not started: nothing drains the queue.
        s.submit(async { Ok(()) }).await.unwrap();
        let err = s.submit(async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, SchedulerError::SubmitTimeout(_)));
        assert_eq!(s.stats().rejected_tasks, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_policy_admits_once_space_frees() {
        let s = scheduler(
            SchedulerConfig::new()
                .with_max_concurrent_tasks(1)
                .with_queue_capacity(1)
                .with_overflow(OverflowPolicy::Wait { timeout_ms: 5_000 }),
        );
        s.start().unwrap();
        for _ in 0..4 {
            s.submit(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(())
            })
            .await
            .unwrap();
        }
        tokio::time::timeout(Duration::from_secs(5), async {
            while s.stats().succeeded_tasks < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        s.shutdown_with_grace(Duration::from_secs(5)).await.unwrap();
        assert_eq!(s.stats().discarded_tasks, 0);
    }
}
