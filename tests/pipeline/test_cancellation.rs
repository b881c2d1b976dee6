//! Cancellation of pending and running executions.

use std::sync::Arc;

use nocode_playwright_lib::error::AppError;
use nocode_playwright_lib::models::{ExecutionStatus, NewExecution};
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

use super::mock_runner::{Script, exit, output};
use super::test_helpers::{fixture, sign_in_report};

/// (1) Cancelling a running execution kills the runner and records it.
#[tokio::test]
async fn test_cancel_running_execution() {
    let fx = fixture(Script::HangUntilCancelled).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let handle = fx.orchestrator.submit(created.id);
    fx.runner.started.notified().await;
    assert_eq!(fx.record(created.id).await.status, ExecutionStatus::Running);

    let cancelled = assert_ok!(fx.orchestrator.cancel(created.id).await);
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
    assert_ok!(handle.await);

    let done = fx.record(created.id).await;
    assert_eq!(done.status, ExecutionStatus::Cancelled);
    assert!(done.start_time.is_some());
    assert!(done.end_time.is_some());
    assert!(fx.orchestrator.get_results(created.id).await.unwrap().is_empty());
    assert_eq!(fx.workspaces_left(), 0);
}

/// (2) A pending execution cancelled before it starts never reaches the runner.
#[tokio::test]
async fn test_cancelled_pending_execution_never_runs() {
    let fx = fixture(exit(0, &sign_in_report(true), "")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    assert_ok!(fx.orchestrator.cancel(created.id).await);
    let after = assert_ok!(fx.orchestrator.run(created.id).await);

    assert_eq!(after.status, ExecutionStatus::Cancelled);
    assert!(after.start_time.is_none());
    assert!(fx.runner.seen().is_empty());
    assert_eq!(fx.workspaces_left(), 0);
}

/// (3) Terminal executions cannot be cancelled.
#[tokio::test]
async fn test_cancel_terminal_execution_rejected() {
    let fx = fixture(exit(1, "", "boom")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();
    fx.orchestrator.run(created.id).await.unwrap();

    let result = fx.orchestrator.cancel(created.id).await;

    assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    assert_eq!(fx.record(created.id).await.status, ExecutionStatus::Failed);
}

/// (4) A cancel landing before a runner that ignores it finishes is
/// overwritten by the completion write.
#[tokio::test]
async fn test_cancel_racing_completion_last_write_wins() {
    let release = Arc::new(Notify::new());
    let fx = fixture(Script::Gate {
        release: release.clone(),
        output: output(0, &sign_in_report(true), ""),
    })
    .await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let handle = fx.orchestrator.submit(created.id);
    fx.runner.started.notified().await;

    fx.orchestrator.cancel(created.id).await.unwrap();
    assert_eq!(fx.record(created.id).await.status, ExecutionStatus::Cancelled);

    release.notify_one();
    handle.await.unwrap();

    let done = fx.record(created.id).await;
    assert_eq!(done.status, ExecutionStatus::Completed);
    assert!(done.end_time.is_some());
    assert_eq!(fx.orchestrator.get_results(created.id).await.unwrap().len(), 1);
}

/// (5) Unknown executions cannot be cancelled.
#[tokio::test]
async fn test_cancel_unknown_execution() {
    let fx = fixture(exit(0, "", "")).await;

    let err = assert_err!(fx.orchestrator.cancel(uuid::Uuid::new_v4()).await);

    assert!(matches!(err, AppError::NotFound(_)));
}
