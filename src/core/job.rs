//! Unit-of-work abstraction.
//!
//! A [`WorkItem`] is an opaque, zero-argument asynchronous computation. The
//! scheduler tracks nothing about it except the [`TaskId`] it assigns at
//! submission. Whatever the computation returns is discarded; only
//! success or failure is observed, and only for logging.
//!
//! Callers that need a result should carry their own channel into the job:
//!
//! ```rust,ignore
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! scheduler.submit(async move {
//!     let summary = learn_from_articles().await?;
//!     let _ = tx.send(summary);
//!     Ok(())
//! }).await?;
//! ```

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Per-scheduler task sequence number, used only for logging and accounting.
pub type TaskId = u64;

/// Deferred computation executed by the scheduler.
///
/// The `cancel` token is triggered when the scheduler shuts down. Honouring
/// it is voluntary: a job that ignores it is allowed to run to completion.
#[async_trait]
pub trait Job: Send + 'static {
    /// Run the job to completion, consuming it.
    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// Boxed job as held by the pending queue.
pub type WorkItem = Box<dyn Job>;

/// Job built from a plain future. It never observes cancellation.
pub struct FutureJob<F> {
    fut: F,
}

impl<F> FutureJob<F>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Wrap a future.
    pub const fn new(fut: F) -> Self {
        Self { fut }
    }
}

#[async_trait]
impl<F> Job for FutureJob<F>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(self: Box<Self>, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.fut.await
    }
}

/// Job built from a closure that receives the cancellation token.
pub struct CancellableJob<F> {
    make: F,
}

impl<F, Fut> CancellableJob<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Wrap a closure producing the job's future.
    pub const fn new(make: F) -> Self {
        Self { make }
    }
}

#[async_trait]
impl<F, Fut> Job for CancellableJob<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        (self.make)(cancel).await
    }
}
