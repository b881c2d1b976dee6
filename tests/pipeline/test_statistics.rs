//! Aggregate statistics over recorded executions.

use nocode_playwright_lib::models::{ExecutionFilter, ExecutionStatus, NewExecution};

use super::mock_runner::exit;
use super::test_helpers::{fixture, sign_in_report};

/// (1) No executions yields all-zero statistics.
#[tokio::test]
async fn test_statistics_empty() {
    let fx = fixture(exit(0, "", "")).await;

    let stats = fx
        .orchestrator
        .statistics(&ExecutionFilter::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 0);
    assert_eq!(stats.passed_count, 0);
    assert_eq!(stats.failed_count, 0);
    assert_eq!(stats.average_duration_seconds, 0.0);
    assert_eq!(stats.success_rate_percent, 0.0);
}

/// (2) Completed, failed and pending executions are all counted in the total.
#[tokio::test]
async fn test_statistics_over_mixed_outcomes() {
    let passing = fixture(exit(0, &sign_in_report(true), "")).await;
    let completed = passing
        .orchestrator
        .create_execution(NewExecution::for_suite(passing.project.id, passing.suite.id))
        .await
        .unwrap();
    passing.orchestrator.run(completed.id).await.unwrap();
    let pending = passing
        .orchestrator
        .create_execution(NewExecution::for_project(passing.project.id))
        .await
        .unwrap();

    let stats = passing
        .orchestrator
        .statistics(&ExecutionFilter {
            project_id: Some(passing.project.id),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.passed_count, 1);
    assert_eq!(stats.failed_count, 0);
    assert_eq!(stats.success_rate_percent, 50.0);
    assert!(stats.average_duration_seconds >= 0.0);

    let only_pending = passing
        .orchestrator
        .statistics(&ExecutionFilter {
            status: Some(ExecutionStatus::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(only_pending.total, 1);
    assert_eq!(only_pending.average_duration_seconds, 0.0);
    assert_eq!(
        passing.record(pending.id).await.status,
        ExecutionStatus::Pending
    );
}

/// (3) Failed runs count as failures.
#[tokio::test]
async fn test_statistics_counts_failures() {
    let fx = fixture(exit(1, "", "crashed")).await;
    for _ in 0..2 {
        let created = fx
            .orchestrator
            .create_execution(NewExecution::for_suite(fx.project.id, fx.suite.id))
            .await
            .unwrap();
        fx.orchestrator.run(created.id).await.unwrap();
    }

    let stats = fx
        .orchestrator
        .statistics(&ExecutionFilter {
            test_suite_id: Some(fx.suite.id),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.passed_count, 0);
    assert_eq!(stats.failed_count, 2);
    assert_eq!(stats.success_rate_percent, 0.0);
}
