//! Scheduler construction helpers.

use crate::config::SchedulerConfig;
use crate::core::{SchedulerError, Spawn, TaskScheduler};
use crate::runtime::TokioSpawner;

/// Build a scheduler that spawns onto the current tokio runtime.
///
/// # Errors
///
/// - `SchedulerError::InvalidConfig` if the configuration is invalid
/// - `SchedulerError::InvalidConfig` if called outside a tokio runtime
pub fn build_scheduler(cfg: &SchedulerConfig) -> Result<TaskScheduler<TokioSpawner>, SchedulerError> {
    let spawner = TokioSpawner::current()
        .map_err(|e| SchedulerError::InvalidConfig(format!("no tokio runtime: {e}")))?;
    build_scheduler_with(cfg, spawner)
}

/// Build a scheduler with an explicit spawner.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
pub fn build_scheduler_with<S>(cfg: &SchedulerConfig, spawner: S) -> Result<TaskScheduler<S>, SchedulerError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    TaskScheduler::new(cfg.clone(), spawner)
}

/// Build a scheduler from `TASK_SCHEDULER_*` environment variables.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` on a malformed variable, invalid
/// values, or a missing tokio runtime.
pub fn build_scheduler_from_env() -> Result<TaskScheduler<TokioSpawner>, SchedulerError> {
    let cfg = SchedulerConfig::from_env().map_err(SchedulerError::InvalidConfig)?;
    build_scheduler(&cfg)
}
