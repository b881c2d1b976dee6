//! Runner adapter: launches the external browser test runner.
//!
//! The orchestrator only talks to [`RunnerAdapter`], so tests substitute a
//! scripted runner for the real `npx playwright test` process.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::BrowserType;

/// One runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerRequest {
    /// Generated project root; the process runs here
    pub working_dir: PathBuf,
    /// Spec file or test directory, relative to `working_dir`
    pub test_path: PathBuf,
    pub browser_type: BrowserType,
    /// Extra environment variables for the process
    pub environment: BTreeMap<String, String>,
}

/// Captured output of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunnerOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// How a runner invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerOutcome {
    Finished(RunnerOutput),
    /// The cancellation token fired and the process was killed.
    Cancelled,
}

/// Capability interface over the external runner.
#[async_trait]
pub trait RunnerAdapter: Send + Sync {
    /// Run the tests at `request.test_path` and wait for the process.
    ///
    /// Implementations should stop the process once `cancel` fires. Dropping
    /// the returned future must not leave the process running.
    async fn spawn(
        &self,
        request: RunnerRequest,
        cancel: CancellationToken,
    ) -> AppResult<RunnerOutcome>;
}

/// Runs Playwright's CLI with the JSON reporter on stdout.
#[derive(Debug, Clone)]
pub struct PlaywrightRunner {
    program: String,
    args: Vec<String>,
}

impl PlaywrightRunner {
    /// `program` plus leading `args`, e.g. `npx` and `["playwright", "test"]`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, request: &RunnerRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&request.test_path)
            .arg(format!("--project={}", request.browser_type))
            .arg("--reporter=json")
            .current_dir(&request.working_dir)
            .envs(&request.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Default for PlaywrightRunner {
    fn default() -> Self {
        Self::new("npx", vec!["playwright".to_string(), "test".to_string()])
    }
}

#[async_trait]
impl RunnerAdapter for PlaywrightRunner {
    async fn spawn(
        &self,
        request: RunnerRequest,
        cancel: CancellationToken,
    ) -> AppResult<RunnerOutcome> {
        debug!(
            program = %self.program,
            test_path = %request.test_path.display(),
            browser = %request.browser_type,
            "spawning runner"
        );

        let child = self
            .command(&request)
            .spawn()
            .map_err(|e| AppError::Runner(format!("Failed to spawn {}: {}", self.program, e)))?;

        // Dropping the wait future drops the child, and kill_on_drop kills it.
        tokio::select! {
            output = child.wait_with_output() => {
                let output = output
                    .map_err(|e| AppError::Runner(format!("Failed to wait for runner: {}", e)))?;
                Ok(RunnerOutcome::Finished(RunnerOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }))
            }
            _ = cancel.cancelled() => {
                info!("Runner for {} killed on cancellation", request.working_dir.display());
                Ok(RunnerOutcome::Cancelled)
            }
        }
    }
}
