//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use background_task_scheduler::config::{OverflowPolicy, SchedulerConfig, DEFAULT_MAX_CONCURRENT_TASKS};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (format!("TASK_SCHEDULER_{k}"), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.max_concurrent_tasks, DEFAULT_MAX_CONCURRENT_TASKS);
    assert_eq!(cfg.max_concurrent_tasks, 3);
    assert_eq!(cfg.queue_capacity, None);
    assert_eq!(cfg.overflow, OverflowPolicy::Reject);
    assert_eq!(cfg.poll_interval(), None);
    assert_eq!(cfg.shutdown_timeout(), None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_builder_methods() {
    let cfg = SchedulerConfig::new()
        .with_max_concurrent_tasks(5)
        .with_queue_capacity(20)
        .with_overflow(OverflowPolicy::Wait { timeout_ms: 100 })
        .with_poll_interval(Duration::from_secs(1))
        .with_shutdown_timeout(Duration::from_millis(1500));
    assert_eq!(cfg.max_concurrent_tasks, 5);
    assert_eq!(cfg.queue_capacity, Some(20));
    assert_eq!(cfg.poll_interval(), Some(Duration::from_secs(1)));
    assert_eq!(cfg.shutdown_timeout(), Some(Duration::from_millis(1500)));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_invalid_max_concurrent_tasks() {
    assert!(SchedulerConfig::new().with_max_concurrent_tasks(0).validate().is_err());
}

#[test]
fn test_invalid_queue_capacity() {
    assert!(SchedulerConfig::new().with_queue_capacity(0).validate().is_err());
}

#[test]
fn test_invalid_poll_interval() {
    assert!(SchedulerConfig::new()
        .with_poll_interval(Duration::ZERO)
        .validate()
        .is_err());
}

#[test]
fn test_wait_policy_requires_capacity() {
    let cfg = SchedulerConfig::new().with_overflow(OverflowPolicy::Wait { timeout_ms: 10 });
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json() {
    let json = r#"{
        "max_concurrent_tasks": 2,
        "queue_capacity": 10,
        "overflow": { "policy": "wait", "timeout_ms": 500 },
        "shutdown_timeout_ms": 3000
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.max_concurrent_tasks, 2);
    assert_eq!(cfg.queue_capacity, Some(10));
    assert_eq!(cfg.overflow, OverflowPolicy::Wait { timeout_ms: 500 });
    assert_eq!(cfg.poll_interval_ms, None);
    assert_eq!(cfg.shutdown_timeout(), Some(Duration::from_secs(3)));
}

#[test]
fn test_from_json_empty_object_uses_defaults() {
    let cfg = SchedulerConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{"max_concurrent_tasks": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("MAX_CONCURRENT_TASKS", "4"),
        ("QUEUE_CAPACITY", "16"),
        ("OVERFLOW", "wait"),
        ("SUBMIT_TIMEOUT_MS", "250"),
        ("SHUTDOWN_TIMEOUT_MS", "2000"),
    ]))
    .unwrap();
    assert_eq!(cfg.max_concurrent_tasks, 4);
    assert_eq!(cfg.queue_capacity, Some(16));
    assert_eq!(cfg.overflow, OverflowPolicy::Wait { timeout_ms: 250 });
    assert_eq!(cfg.shutdown_timeout_ms, Some(2000));
}

#[test]
fn test_from_lookup_empty_is_default() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_from_lookup_malformed() {
    let err = SchedulerConfig::from_lookup(lookup(&[("MAX_CONCURRENT_TASKS", "three")])).unwrap_err();
    assert!(err.contains("TASK_SCHEDULER_MAX_CONCURRENT_TASKS"));

    let err = SchedulerConfig::from_lookup(lookup(&[("OVERFLOW", "drop_oldest")])).unwrap_err();
    assert!(err.contains("unknown policy"));
}
