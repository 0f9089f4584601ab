//! Configuration models for the scheduler.

pub mod scheduler;

pub use scheduler::{OverflowPolicy, SchedulerConfig, DEFAULT_MAX_CONCURRENT_TASKS, ENV_PREFIX};
