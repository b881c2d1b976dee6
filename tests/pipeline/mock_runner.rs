//! Scripted stand-in for the Playwright process.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nocode_playwright_lib::db::MemoryDb;
use nocode_playwright_lib::error::{AppError, AppResult};
use nocode_playwright_lib::models::TestSuite;
use nocode_playwright_lib::services::{RunnerAdapter, RunnerOutcome, RunnerOutput, RunnerRequest};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// What the mock does when spawned.
#[derive(Clone)]
pub enum Script {
    /// Exit immediately with the given output.
    Exit(RunnerOutput),
    /// Block until cancelled, like a killed process.
    HangUntilCancelled,
    /// Block far beyond any test timeout, ignoring cancellation.
    HangForever,
    /// Fail to start.
    SpawnError(String),
    /// Block until `release` fires, ignoring cancellation, then exit.
    Gate {
        release: Arc<Notify>,
        output: RunnerOutput,
    },
}

/// What the mock saw for one spawn.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub request: RunnerRequest,
    /// Whether the test path existed inside the workspace at spawn time
    pub test_path_existed: bool,
}

pub struct MockRunner {
    script: Script,
    seen: Mutex<Vec<SeenRequest>>,
    /// Suite written to the store when the next spawn starts
    edit_on_spawn: Mutex<Option<(MemoryDb, TestSuite)>>,
    /// Signalled once per spawn, after the request is recorded
    pub started: Arc<Notify>,
}

impl MockRunner {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
            edit_on_spawn: Mutex::new(None),
            started: Arc::new(Notify::new()),
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Overwrite `suite` in `db` while the run is in progress.
    pub fn edit_suite_on_spawn(&self, db: MemoryDb, suite: TestSuite) {
        *self.edit_on_spawn.lock().unwrap() = Some((db, suite));
    }
}

pub fn exit(code: i32, stdout: &str, stderr: &str) -> Script {
    Script::Exit(output(code, stdout, stderr))
}

pub fn output(code: i32, stdout: &str, stderr: &str) -> RunnerOutput {
    RunnerOutput {
        exit_code: Some(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl RunnerAdapter for MockRunner {
    async fn spawn(
        &self,
        request: RunnerRequest,
        cancel: CancellationToken,
    ) -> AppResult<RunnerOutcome> {
        let test_path_existed = request.working_dir.join(&request.test_path).exists();
        self.seen.lock().unwrap().push(SeenRequest {
            request,
            test_path_existed,
        });
        let edit = self.edit_on_spawn.lock().unwrap().take();
        if let Some((db, suite)) = edit {
            db.put_suite(suite).await;
        }
        self.started.notify_one();

        match &self.script {
            Script::Exit(output) => Ok(RunnerOutcome::Finished(output.clone())),
            Script::HangUntilCancelled => {
                cancel.cancelled().await;
                Ok(RunnerOutcome::Cancelled)
            }
            Script::HangForever => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(RunnerOutcome::Finished(output(0, "", "")))
            }
            Script::SpawnError(message) => Err(AppError::Runner(message.clone())),
            Script::Gate { release, output } => {
                release.notified().await;
                Ok(RunnerOutcome::Finished(output.clone()))
            }
        }
    }
}
