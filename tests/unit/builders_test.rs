//! Tests for builder modules

use background_task_scheduler::builders::{build_scheduler, build_scheduler_with};
use background_task_scheduler::config::SchedulerConfig;
use background_task_scheduler::core::SchedulerError;
use background_task_scheduler::runtime::TokioSpawner;

#[tokio::test]
async fn test_build_scheduler_defaults() {
    let scheduler = build_scheduler(&SchedulerConfig::new()).unwrap();
    assert_eq!(scheduler.config().max_concurrent_tasks, 3);
    let stats = scheduler.stats();
    assert_eq!(stats.max_concurrent_tasks, 3);
    assert_eq!(stats.running_tasks, 0);
    assert_eq!(stats.pending_tasks, 0);
}

#[tokio::test]
async fn test_build_scheduler_invalid_config() {
    let res = build_scheduler(&SchedulerConfig::new().with_max_concurrent_tasks(0));
    assert!(matches!(res, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_build_scheduler_outside_runtime() {
    let res = build_scheduler(&SchedulerConfig::new());
    assert!(matches!(res, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_build_scheduler_with_explicit_handle() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let scheduler =
        build_scheduler_with(&SchedulerConfig::new(), TokioSpawner::new(rt.handle().clone())).unwrap();
    scheduler.start().unwrap();

    rt.block_on(async {
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler
            .submit(async move {
                let _ = tx.send(7);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), 7);
        scheduler.shutdown().await.unwrap();
    });
}
