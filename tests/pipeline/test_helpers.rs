//! Shared fixtures for pipeline tests.

use std::sync::Arc;
use std::time::Duration;

use nocode_playwright_lib::db::{ExecutionStore, MemoryDb};
use nocode_playwright_lib::models::{
    ExpectedResult, Page, Project, RawTestStep, Selector, SelectorKind, TestCase,
    TestExecution, TestSuite,
};
use nocode_playwright_lib::services::{
    ExecutionOrchestrator, OrchestratorSettings, ProjectScaffolder, TemplateRenderer,
};
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

use super::mock_runner::{MockRunner, Script};

/// Seeded store, orchestrator and scripted runner.
pub struct Fixture {
    pub db: MemoryDb,
    pub orchestrator: ExecutionOrchestrator,
    pub runner: Arc<MockRunner>,
    pub work_dir: TempDir,
    pub project: Project,
    pub suite: TestSuite,
}

/// Login page with a css `submit` and an id `user` selector.
pub fn login_page() -> Page {
    Page::new("Login", "https://x.test/login")
        .with_selector("submit", Selector::new(SelectorKind::Css, "#submit"))
        .unwrap()
        .with_selector("user", Selector::new(SelectorKind::Id, "user"))
        .unwrap()
}

/// One suite with one case that signs in on `page`.
pub fn sign_in_suite(project_id: Uuid, page: &Page) -> TestSuite {
    let mut case = TestCase::new(
        "valid user",
        vec![
            RawTestStep::new("type", "#user").with_value("alice"),
            RawTestStep::new("click", "submit").on_page(page.id),
        ],
    );
    case.expected_results = Some(vec![ExpectedResult {
        selector: "h1".to_string(),
        expected_value: json!("Welcome"),
        comparison_type: "contains".to_string(),
    }]);
    TestSuite::new(project_id, "Sign In", vec![case])
}

pub async fn fixture(script: Script) -> Fixture {
    fixture_with_timeout(script, Duration::from_secs(30)).await
}

pub async fn fixture_with_timeout(script: Script, runner_timeout: Duration) -> Fixture {
    let db = MemoryDb::new();
    let page = login_page();
    let mut project = Project::new("Shop");
    let suite = sign_in_suite(project.id, &page);
    project.suite_ids.push(suite.id);

    db.put_page(page.clone()).await.unwrap();
    db.put_suite(suite.clone()).await;
    db.put_project(project.clone()).await;

    let work_dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(MockRunner::new(script));
    let store = Arc::new(db.clone());
    let orchestrator = ExecutionOrchestrator::new(
        store.clone(),
        store,
        runner.clone(),
        TemplateRenderer::default(),
        OrchestratorSettings {
            work_dir: work_dir.path().to_path_buf(),
            runner_timeout,
        },
    );

    Fixture {
        db,
        orchestrator,
        runner,
        work_dir,
        project,
        suite,
    }
}

impl Fixture {
    pub fn scaffolder(&self) -> ProjectScaffolder {
        ProjectScaffolder::new(Arc::new(self.db.clone()), TemplateRenderer::default())
    }

    /// Number of execution workspaces left under the work dir.
    pub fn workspaces_left(&self) -> usize {
        std::fs::read_dir(self.work_dir.path())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_name().to_string_lossy().starts_with("test_"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub async fn record(&self, id: Uuid) -> TestExecution {
        self.db.get_execution(id).await.unwrap().unwrap()
    }
}

/// Playwright JSON reporter document for every case of `suite`.
pub fn report_for(suite: &TestSuite, ok: bool) -> String {
    let cases: Vec<_> = suite
        .test_cases
        .iter()
        .map(|case| {
            json!({
                "title": case.name,
                "specs": [{
                    "title": case.name,
                    "ok": ok,
                    "tests": [{"results": [{
                        "status": if ok { "passed" } else { "failed" },
                        "duration": 42,
                        "error": if ok { json!(null) } else { json!({"message": "expect failed"}) },
                        "stdout": [{"text": "log line"}]
                    }]}]
                }]
            })
        })
        .collect();

    json!({
        "suites": [{
            "title": "sign_in.spec.ts",
            "specs": [],
            "suites": [{"title": suite.name, "specs": [], "suites": cases}]
        }]
    })
    .to_string()
}

/// Report for the fixture's sign-in suite; titles depend only on names.
pub fn sign_in_report(ok: bool) -> String {
    report_for(&sign_in_suite(Uuid::nil(), &login_page()), ok)
}
