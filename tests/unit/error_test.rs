//! Tests for error types

use std::time::Duration;

use background_task_scheduler::core::SchedulerError;

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull { capacity: 8 };
    assert_eq!(format!("{}", err), "queue full: capacity 8 reached");
}

#[test]
fn test_submit_timeout_error() {
    let err = SchedulerError::SubmitTimeout(Duration::from_millis(250));
    assert_eq!(
        format!("{}", err),
        "submission timed out after 250ms waiting for queue space"
    );
}

#[test]
fn test_shutdown_timed_out_error() {
    let err = SchedulerError::ShutdownTimedOut { remaining: 2 };
    assert_eq!(format!("{}", err), "shutdown timed out with 2 task(s) still running");
}

#[test]
fn test_task_execution_failed_error() {
    let err = SchedulerError::TaskExecutionFailed {
        task_id: 42,
        reason: "llm completion failed".to_string(),
    };
    assert_eq!(format!("{}", err), "task 42 failed: llm completion failed");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("max_concurrent_tasks must be greater than 0".into());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_concurrent_tasks must be greater than 0"
    );
}
