//! Execution orchestrator: owns the execution state machine.
//!
//! A run compiles its suites into an execution-scoped workspace under the
//! work dir, hands it to the [`RunnerAdapter`], records the outcome and
//! removes the workspace last, whatever happened before.
//!
//! Record updates are blind partial writes. A cancel racing the completion
//! write is last-write-wins: whichever update lands second is what the record
//! shows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value as JsonValue};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::{EntitySource, ExecutionStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    ExecutionEvent, ExecutionFilter, ExecutionStatistics, ExecutionStatus, ExecutionUpdate,
    NewExecution, ParsedRun, TestExecution, TestResult, TestStatus, TestSuite,
};
use crate::services::event_broadcaster::EventBroadcaster;
use crate::services::extraction::{CaseIndex, aggregate_statistics, parse};
use crate::services::renderer::TemplateRenderer;
use crate::services::runner::{RunnerAdapter, RunnerOutcome, RunnerOutput, RunnerRequest};
use crate::services::scaffold::{ProjectScaffolder, spec_path};

/// Prefix of execution workspace directory names.
pub const WORKSPACE_PREFIX: &str = "test_";

/// Test directory handed to the runner for project-wide runs.
const PROJECT_TEST_DIR: &str = "tests";

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Parent of execution workspaces; resolved against the current
    /// directory when relative
    pub work_dir: PathBuf,
    /// Wall-clock limit for one runner process
    pub runner_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(crate::config::defaults::WORK_DIR),
            runner_timeout: Duration::from_secs(crate::config::defaults::RUNNER_TIMEOUT_SECS),
        }
    }
}

/// Workspace directory of an execution.
pub fn workspace_dir(work_dir: &Path, execution_id: Uuid) -> PathBuf {
    work_dir.join(format!("{}{}", WORKSPACE_PREFIX, execution_id))
}

/// What one attempt produced before it is recorded.
struct Attempt {
    outcome: RunnerOutcome,
    suites: Vec<TestSuite>,
}

/// Schedules, runs and cancels test executions.
#[derive(Clone)]
pub struct ExecutionOrchestrator {
    store: Arc<dyn ExecutionStore>,
    entities: Arc<dyn EntitySource>,
    scaffolder: ProjectScaffolder,
    runner: Arc<dyn RunnerAdapter>,
    settings: OrchestratorSettings,
    events: EventBroadcaster,
    tokens: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl ExecutionOrchestrator {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        entities: Arc<dyn EntitySource>,
        runner: Arc<dyn RunnerAdapter>,
        renderer: TemplateRenderer,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            scaffolder: ProjectScaffolder::new(entities.clone(), renderer),
            store,
            entities,
            runner,
            settings,
            events: EventBroadcaster::new(),
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Insert a `pending` execution for an existing project and, optionally,
    /// one of its suites.
    pub async fn create_execution(&self, request: NewExecution) -> AppResult<TestExecution> {
        self.entities
            .get_project(request.project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {}", request.project_id)))?;

        if let Some(suite_id) = request.test_suite_id {
            let suite = self.fetch_suite(suite_id).await?;
            if suite.project_id != request.project_id {
                return Err(AppError::InvalidInput(format!(
                    "Test suite {} does not belong to project {}",
                    suite_id, request.project_id
                )));
            }
        }

        let execution = self.store.create_execution(request.into_execution()).await?;
        self.register_token(execution.id);
        self.events.send(ExecutionEvent::created(&execution));
        info!(
            "Created execution {} for project {} ({})",
            execution.id, execution.project_id, execution.browser_type
        );
        Ok(execution)
    }

    /// Run an execution in the background. Failures end up in the record.
    pub fn submit(&self, execution_id: Uuid) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run(execution_id).await {
                error!("Execution {} could not be run: {}", execution_id, e);
            }
        })
    }

    /// Drive a `pending` execution to a terminal state.
    ///
    /// Errors from compiling, spawning or parsing are recorded as `failed`
    /// and do not surface here. An execution cancelled before it started is
    /// returned untouched.
    pub async fn run(&self, execution_id: Uuid) -> AppResult<TestExecution> {
        let execution = self.fetch_execution(execution_id).await?;
        if execution.status == ExecutionStatus::Cancelled {
            info!("Execution {} was cancelled before it started", execution_id);
            self.release_token(execution_id);
            return Ok(execution);
        }
        let running = execution.status.transition_to(ExecutionStatus::Running)?;

        let token = self.register_token(execution_id);
        let execution = self
            .store
            .update_execution(
                execution_id,
                ExecutionUpdate {
                    status: Some(running),
                    start_time: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        self.events
            .send(ExecutionEvent::updated(execution_id, running, None));
        info!("Execution {} running", execution_id);

        let workspace = std::path::absolute(workspace_dir(&self.settings.work_dir, execution_id));
        let attempt = match &workspace {
            Ok(workspace) => self.attempt(&execution, workspace, token).await,
            Err(e) => Err(AppError::FileSystem(format!(
                "Failed to resolve work dir {}: {}",
                self.settings.work_dir.display(),
                e
            ))),
        };

        let recorded = self.record(execution_id, attempt).await;

        if let Ok(workspace) = &workspace {
            remove_workspace(workspace).await;
        }
        self.release_token(execution_id);

        recorded
    }

    /// Force an execution to `cancelled` and kill its runner, if any.
    ///
    /// Only valid while `pending` or `running`.
    pub async fn cancel(&self, execution_id: Uuid) -> AppResult<TestExecution> {
        let execution = self.fetch_execution(execution_id).await?;
        let cancelled = execution.status.transition_to(ExecutionStatus::Cancelled)?;

        let updated = self
            .store
            .update_execution(execution_id, ExecutionUpdate::status(cancelled))
            .await?;

        // A pending execution keeps its cancelled token until `run` sees it.
        let token = self
            .tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&execution_id)
            .cloned();
        if let Some(token) = token {
            token.cancel();
        }

        self.events
            .send(ExecutionEvent::updated(execution_id, cancelled, None));
        info!("Execution {} cancelled", execution_id);
        Ok(updated)
    }

    pub async fn get_execution(&self, execution_id: Uuid) -> AppResult<TestExecution> {
        self.fetch_execution(execution_id).await
    }

    pub async fn get_results(&self, execution_id: Uuid) -> AppResult<Vec<TestResult>> {
        self.store.get_test_results(execution_id).await
    }

    /// Statistics over the executions matching `filter`.
    pub async fn statistics(&self, filter: &ExecutionFilter) -> AppResult<ExecutionStatistics> {
        let executions = self.store.list_executions(filter).await?;
        Ok(aggregate_statistics(&executions))
    }

    // ========================================================================
    // Run internals
    // ========================================================================

    async fn attempt(
        &self,
        execution: &TestExecution,
        workspace: &Path,
        token: CancellationToken,
    ) -> AppResult<Attempt> {
        let suite_ids = match execution.test_suite_id {
            Some(suite_id) => vec![suite_id],
            None => {
                let project = self
                    .entities
                    .get_project(execution.project_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Project {}", execution.project_id)))?;
                if project.suite_ids.is_empty() {
                    return Err(AppError::InvalidInput(format!(
                        "Project {} has no test suites",
                        project.id
                    )));
                }
                project.suite_ids
            }
        };

        let mut overrides = Map::new();
        overrides.insert(
            "browsers".to_string(),
            JsonValue::Array(vec![JsonValue::String(
                execution.browser_type.as_str().to_string(),
            )]),
        );
        let (_, suites) = self
            .scaffolder
            .generate_with_suites(&suite_ids, workspace, &overrides)
            .await?;

        let test_path = match (execution.test_suite_id, suites.first()) {
            (Some(_), Some(suite)) => PathBuf::from(spec_path(suite)?),
            _ => PathBuf::from(PROJECT_TEST_DIR),
        };
        let request = RunnerRequest {
            working_dir: workspace.to_path_buf(),
            test_path,
            browser_type: execution.browser_type,
            environment: execution.environment.clone(),
        };

        let limit = self.settings.runner_timeout;
        let outcome = tokio::time::timeout(limit, self.runner.spawn(request, token))
            .await
            .map_err(|_| AppError::Timeout(timeout_secs(limit)))??;

        Ok(Attempt { outcome, suites })
    }

    /// Write the terminal state of an attempt.
    async fn record(
        &self,
        execution_id: Uuid,
        attempt: AppResult<Attempt>,
    ) -> AppResult<TestExecution> {
        let end_time = Some(Utc::now());

        let (update, parsed, suites) = match attempt {
            Err(e) => {
                warn!("Execution {} failed: {}", execution_id, e);
                (
                    ExecutionUpdate {
                        status: Some(ExecutionStatus::Failed),
                        end_time,
                        error_message: Some(e.to_string()),
                        ..Default::default()
                    },
                    None,
                    Vec::new(),
                )
            }
            Ok(Attempt {
                outcome: RunnerOutcome::Cancelled,
                ..
            }) => (
                ExecutionUpdate {
                    status: Some(ExecutionStatus::Cancelled),
                    end_time,
                    ..Default::default()
                },
                None,
                Vec::new(),
            ),
            Ok(Attempt {
                outcome: RunnerOutcome::Finished(output),
                suites,
            }) => {
                let (update, parsed) = finished_update(execution_id, &output);
                (
                    ExecutionUpdate {
                        end_time,
                        ..update
                    },
                    parsed,
                    suites,
                )
            }
        };

        let status = update.status;
        let error_message = update.error_message.clone();
        let execution = self.store.update_execution(execution_id, update).await?;

        if let Some(run) = parsed {
            self.store_results(execution_id, &run, &suites).await?;
        }

        if let Some(status) = status {
            self.events
                .send(ExecutionEvent::updated(execution_id, status, error_message));
            info!("Execution {} finished as {}", execution_id, status);
        }
        Ok(execution)
    }

    async fn store_results(
        &self,
        execution_id: Uuid,
        run: &ParsedRun,
        suites: &[TestSuite],
    ) -> AppResult<()> {
        let index = CaseIndex::new(suites);
        let matched = index.match_cases(run);
        let (mut passed, mut failed) = (0u32, 0u32);
        for (case_id, case) in &matched {
            let result = TestResult::from_case(execution_id, *case_id, case);
            match result.status {
                TestStatus::Passed => passed += 1,
                TestStatus::Failed => failed += 1,
                TestStatus::Skipped => {}
            }
            self.store.insert_test_result(result).await?;
        }

        self.events.send(ExecutionEvent::results_available(
            execution_id,
            passed,
            failed,
            matched.len() as u32,
        ));
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn fetch_execution(&self, id: Uuid) -> AppResult<TestExecution> {
        self.store
            .get_execution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution {}", id)))
    }

    async fn fetch_suite(&self, id: Uuid) -> AppResult<TestSuite> {
        self.entities
            .get_test_suite_with_cases(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test suite {}", id)))
    }

    fn register_token(&self, execution_id: Uuid) -> CancellationToken {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(execution_id)
            .or_default()
            .clone()
    }

    fn release_token(&self, execution_id: Uuid) {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&execution_id);
    }
}

/// Status, error and results for a process that ran to completion.
///
/// Exit 0 with an unparsable document is a failure. A non-zero exit records
/// stderr and keeps whatever document stdout held.
/// Whole seconds of a timeout, rounded up so sub-second limits never read 0.
fn timeout_secs(limit: Duration) -> u64 {
    limit.as_secs() + u64::from(limit.subsec_nanos() > 0)
}

fn finished_update(execution_id: Uuid, output: &RunnerOutput) -> (ExecutionUpdate, Option<ParsedRun>) {
    let parsed = parse(&output.stdout);

    if output.success() {
        return match parsed {
            Ok(run) => (
                ExecutionUpdate {
                    status: Some(ExecutionStatus::Completed),
                    results: Some(run.raw.clone()),
                    ..Default::default()
                },
                Some(run),
            ),
            Err(e) => (
                ExecutionUpdate {
                    status: Some(ExecutionStatus::Failed),
                    error_message: Some(e.to_string()),
                    ..Default::default()
                },
                None,
            ),
        };
    }

    warn!(
        "Runner for execution {} exited with {:?}",
        execution_id, output.exit_code
    );
    let run = parsed.ok();
    (
        ExecutionUpdate {
            status: Some(ExecutionStatus::Failed),
            results: run.as_ref().map(|r| r.raw.clone()),
            error_message: Some(output.stderr.clone()),
            ..Default::default()
        },
        run,
    )
}

async fn remove_workspace(workspace: &Path) {
    match tokio::fs::remove_dir_all(workspace).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove workspace {}: {}", workspace.display(), e),
    }
}
