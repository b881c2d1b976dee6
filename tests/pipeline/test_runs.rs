//! Execution runs driven to completion or failure.

use std::path::PathBuf;
use std::time::Duration;

use nocode_playwright_lib::error::AppError;
use nocode_playwright_lib::models::{
    BrowserType, ExecutionEvent, ExecutionStatus, NewExecution, RawTestStep, TestCase, TestStatus,
    TestSuite,
};

use super::mock_runner::{Script, exit};
use super::test_helpers::{fixture, fixture_with_timeout, sign_in_report};

/// (1) Exit 0 with a parseable report completes and stores per-case results.
#[tokio::test]
async fn test_successful_run_records_results() {
    let fx = fixture(exit(0, &sign_in_report(true), "")).await;

    let mut request = NewExecution::for_suite(fx.project.id, fx.suite.id)
        .with_browser(BrowserType::Firefox);
    request
        .environment
        .insert("BASE_URL".to_string(), "https://x.test".to_string());
    let created = fx.orchestrator.create_execution(request).await.unwrap();
    assert_eq!(created.status, ExecutionStatus::Pending);

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Completed);
    assert!(done.start_time.is_some());
    assert!(done.end_time.is_some());
    assert!(done.results.is_some());
    assert!(done.error_message.is_none());

    let results = fx.orchestrator.get_results(created.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].test_case_id, fx.suite.test_cases[0].id);
    assert_eq!(results[0].status, TestStatus::Passed);
    assert_eq!(results[0].duration, Some(42));

    let seen = fx.runner.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].test_path_existed);
    assert_eq!(
        seen[0].request.test_path,
        PathBuf::from("tests/sign_in.spec.ts")
    );
    assert_eq!(seen[0].request.browser_type, BrowserType::Firefox);
    assert_eq!(
        seen[0].request.environment.get("BASE_URL").map(String::as_str),
        Some("https://x.test")
    );
    assert!(seen[0].request.working_dir.is_absolute());

    assert_eq!(fx.workspaces_left(), 0);
}

/// (2) Exit 1 with unparseable stdout fails with stderr and no results.
#[tokio::test]
async fn test_crashed_runner_records_stderr() {
    let fx = fixture(exit(1, "not json", "Error: browser crashed")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Failed);
    assert!(done.results.is_none());
    assert_eq!(done.error_message.as_deref(), Some("Error: browser crashed"));
    assert!(done.end_time.is_some());
    assert!(fx.orchestrator.get_results(created.id).await.unwrap().is_empty());
    assert_eq!(fx.workspaces_left(), 0);
}

/// (3) A non-zero exit with a report still stores the failing cases.
#[tokio::test]
async fn test_failing_tests_keep_results() {
    let fx = fixture(exit(1, &sign_in_report(false), "1 failed")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Failed);
    assert!(done.results.is_some());
    assert_eq!(done.error_message.as_deref(), Some("1 failed"));

    let results = fx.orchestrator.get_results(created.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, TestStatus::Failed);
    assert_eq!(results[0].error_message.as_deref(), Some("expect failed"));
}

/// (4) Exit 0 with output that is not a report is a failed extraction.
#[tokio::test]
async fn test_unparseable_success_output_fails() {
    let fx = fixture(exit(0, "Running 1 test", "")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Failed);
    assert!(done.results.is_none());
    assert!(
        done.error_message
            .as_deref()
            .unwrap()
            .starts_with("Extraction failed")
    );
}

/// (5) A project-wide run hands the whole test directory to the runner.
#[tokio::test]
async fn test_project_run_targets_test_dir() {
    let fx = fixture(exit(0, &sign_in_report(true), "")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_project(fx.project.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Completed);
    let seen = fx.runner.seen();
    assert_eq!(seen[0].request.test_path, PathBuf::from("tests"));
    assert!(seen[0].test_path_existed);
    assert_eq!(fx.orchestrator.get_results(created.id).await.unwrap().len(), 1);
}

/// (6) A compile error is recorded and the runner never starts.
#[tokio::test]
async fn test_compile_error_recorded_without_spawn() {
    let fx = fixture(exit(0, "", "")).await;
    let broken = TestSuite::new(
        fx.project.id,
        "Broken",
        vec![TestCase::new("no value", vec![RawTestStep::new("type", "#q")])],
    );
    fx.db.put_suite(broken.clone()).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, broken.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Failed);
    assert!(done.error_message.unwrap().starts_with("Invalid step"));
    assert!(fx.runner.seen().is_empty());
    assert_eq!(fx.workspaces_left(), 0);
}

/// (7) A runner that cannot start is recorded as failed.
#[tokio::test]
async fn test_spawn_error_recorded() {
    let fx = fixture(Script::SpawnError("npx: not found".to_string())).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Failed);
    assert_eq!(
        done.error_message.as_deref(),
        Some("Runner error: npx: not found")
    );
    assert_eq!(fx.workspaces_left(), 0);
}

/// (8) A runner exceeding the timeout is failed and its workspace removed.
#[tokio::test]
async fn test_runner_timeout() {
    let fx = fixture_with_timeout(Script::HangForever, Duration::from_secs(1)).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Failed);
    assert_eq!(
        done.error_message.as_deref(),
        Some("Timeout: runner did not finish within 1 seconds")
    );
    assert!(done.end_time.is_some());
    assert_eq!(fx.workspaces_left(), 0);
}

/// (9) Running a finished execution again is rejected.
#[tokio::test]
async fn test_rerun_rejected() {
    let fx = fixture(exit(0, &sign_in_report(true), "")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();
    fx.orchestrator.run(created.id).await.unwrap();

    let result = fx.orchestrator.run(created.id).await;

    assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    assert_eq!(fx.runner.seen().len(), 1);
}

/// (10) Creating an execution checks the project and suite ownership.
#[tokio::test]
async fn test_create_execution_validates_references() {
    let fx = fixture(exit(0, "", "")).await;

    let missing = fx
        .orchestrator
        .create_execution(NewExecution::for_project(uuid::Uuid::new_v4()))
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let foreign = TestSuite::new(uuid::Uuid::new_v4(), "Elsewhere", Vec::new());
    fx.db.put_suite(foreign.clone()).await;
    let result = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, foreign.id))
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

/// (11) Concurrent executions run in separate workspaces.
#[tokio::test]
async fn test_concurrent_runs_use_separate_workspaces() {
    let fx = fixture(exit(0, &sign_in_report(true), "")).await;
    let first = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();
    let second = fx
        .orchestrator
        .create_execution(NewExecution::for_project(fx.project.id))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        fx.orchestrator.submit(first.id),
        fx.orchestrator.submit(second.id)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(fx.record(first.id).await.status, ExecutionStatus::Completed);
    assert_eq!(fx.record(second.id).await.status, ExecutionStatus::Completed);

    let seen = fx.runner.seen();
    assert_eq!(seen.len(), 2);
    assert_ne!(seen[0].request.working_dir, seen[1].request.working_dir);
    assert!(seen.iter().all(|s| s.test_path_existed));
    assert_eq!(fx.workspaces_left(), 0);
}

/// (12) Subscribers see running, completed and results events in order.
#[tokio::test]
async fn test_run_broadcasts_events() {
    let fx = fixture(exit(0, &sign_in_report(true), "")).await;
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();
    let mut rx = fx.orchestrator.events().subscribe();

    fx.orchestrator.run(created.id).await.unwrap();

    let mut statuses = Vec::new();
    let mut totals = None;
    while let Ok(message) = rx.try_recv() {
        assert_eq!(message.event.execution_id(), created.id);
        match message.event {
            ExecutionEvent::ExecutionUpdated(payload) => statuses.push(payload.status),
            ExecutionEvent::ResultsAvailable(payload) => {
                totals = Some((payload.passed, payload.failed, payload.total))
            }
            ExecutionEvent::ExecutionCreated(_) => panic!("created before subscribing"),
        }
    }
    assert_eq!(
        statuses,
        vec![ExecutionStatus::Running, ExecutionStatus::Completed]
    );
    assert_eq!(totals, Some((1, 0, 1)));
}

/// (13) Results match the cases that were generated, even if the suite is
/// edited while the runner is in progress.
#[tokio::test]
async fn test_results_match_generated_snapshot() {
    let fx = fixture(exit(0, &sign_in_report(true), "")).await;
    let mut edited = fx.suite.clone();
    edited.test_cases = vec![TestCase::new("renamed", Vec::new())];
    fx.runner.edit_suite_on_spawn(fx.db.clone(), edited);
    let created = fx
        .orchestrator
        .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
        .await
        .unwrap();

    let done = fx.orchestrator.run(created.id).await.unwrap();

    assert_eq!(done.status, ExecutionStatus::Completed);
    let results = fx.orchestrator.get_results(created.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].test_case_id, fx.suite.test_cases[0].id);
}
