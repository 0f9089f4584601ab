//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix for environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "TASK_SCHEDULER_";

/// Default concurrency ceiling.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 3;

/// What `submit` does when the pending queue is at capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum OverflowPolicy {
    /// Fail immediately with `QueueFull`.
    #[default]
    Reject,
    /// Suspend the caller until space frees up, failing after `timeout_ms`.
    Wait {
        /// Maximum time to wait for a free slot.
        timeout_ms: u64,
    },
}

/// Immutable scheduler settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum tasks executing at once.
    pub max_concurrent_tasks: usize,
    /// Pending queue capacity; `None` is unbounded.
    pub queue_capacity: Option<usize>,
    /// Behaviour when the queue is full.
    pub overflow: OverflowPolicy,
    /// Optional safety re-check period for the admission loop. The loop is
    /// event-driven and does not need it.
    pub poll_interval_ms: Option<u64>,
    /// Grace period for draining running tasks at shutdown; `None` waits
    /// indefinitely.
    pub shutdown_timeout_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            queue_capacity: None,
            overflow: OverflowPolicy::Reject,
            poll_interval_ms: None,
            shutdown_timeout_ms: None,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency ceiling.
    #[must_use]
    pub const fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Bound the pending queue.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set the overflow policy.
    #[must_use]
    pub const fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Set the safety re-check period.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = Some(duration_ms(interval));
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// Safety re-check period, if any.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }

    /// Shutdown grace period, if any.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_ms.map(Duration::from_millis)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be greater than 0".into());
        }
        if self.queue_capacity == Some(0) {
            return Err("queue_capacity must be greater than 0 when set".into());
        }
        if self.poll_interval_ms == Some(0) {
            return Err("poll_interval_ms must be greater than 0 when set".into());
        }
        if let OverflowPolicy::Wait { .. } = self.overflow {
            if self.queue_capacity.is_none() {
                return Err("wait overflow policy requires a queue_capacity".into());
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `TASK_SCHEDULER_*` environment variables,
    /// reading a `.env` file first if one exists.
    ///
    /// Recognised keys: `MAX_CONCURRENT_TASKS`, `QUEUE_CAPACITY`, `OVERFLOW`
    /// (`reject` or `wait`), `SUBMIT_TIMEOUT_MS`, `POLL_INTERVAL_MS`,
    /// `SHUTDOWN_TIMEOUT_MS`. Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message naming the malformed variable, or a validation error.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SchedulerConfig::from_env`], reading through `lookup`
    /// instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns a message naming the malformed variable, or a validation error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(v) = parse_var::<usize>(&get, "MAX_CONCURRENT_TASKS")? {
            cfg.max_concurrent_tasks = v;
        }
        cfg.queue_capacity = parse_var::<usize>(&get, "QUEUE_CAPACITY")?;
        cfg.poll_interval_ms = parse_var::<u64>(&get, "POLL_INTERVAL_MS")?;
        cfg.shutdown_timeout_ms = parse_var::<u64>(&get, "SHUTDOWN_TIMEOUT_MS")?;

        let timeout_ms = parse_var::<u64>(&get, "SUBMIT_TIMEOUT_MS")?;
        cfg.overflow = match get("OVERFLOW").as_deref().map(str::trim) {
            None | Some("" | "reject") => OverflowPolicy::Reject,
            Some("wait") => OverflowPolicy::Wait {
                timeout_ms: timeout_ms.unwrap_or(1_000),
            },
            Some(other) => {
                return Err(format!("{ENV_PREFIX}OVERFLOW: unknown policy `{other}`"));
            }
        };

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{ENV_PREFIX}{name}: {e}")),
    }
}

const fn duration_ms(d: Duration) -> u64 {
    let ms = d.as_millis();
    if ms > u64::MAX as u128 {
        u64::MAX
    } else {
        ms as u64
    }
}
