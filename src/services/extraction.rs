//! Result extraction: Playwright JSON reporter output to per-case results,
//! plus statistics over executions.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ExecutionStatistics, ExecutionStatus, ParsedCase, ParsedRun, TestExecution, TestStatus,
    TestSuite,
};

// ============================================================================
// Playwright JSON Schema Structs
// ============================================================================

/// Root of the JSON reporter document.
#[derive(Debug, Deserialize)]
pub struct PlaywrightReport {
    #[serde(default)]
    pub suites: Vec<PlaywrightSuite>,
}

/// Describe block or file-level group.
#[derive(Debug, Deserialize)]
pub struct PlaywrightSuite {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub specs: Vec<PlaywrightSpec>,
    #[serde(default)]
    pub suites: Vec<PlaywrightSuite>,
}

/// One test case entry.
#[derive(Debug, Deserialize)]
pub struct PlaywrightSpec {
    pub title: String,
    pub ok: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub error: Option<PlaywrightError>,
    #[serde(default)]
    pub attachments: Vec<PlaywrightAttachment>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub stdout: Vec<OutputChunk>,
    #[serde(default)]
    pub stderr: Vec<OutputChunk>,
    #[serde(default)]
    pub tests: Vec<PlaywrightTest>,
}

/// Test of a spec for one runner project.
#[derive(Debug, Deserialize)]
pub struct PlaywrightTest {
    #[serde(default)]
    pub results: Vec<PlaywrightResult>,
}

/// One attempt (retries produce several).
#[derive(Debug, Deserialize)]
pub struct PlaywrightResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub error: Option<PlaywrightError>,
    #[serde(default)]
    pub errors: Vec<PlaywrightError>,
    #[serde(default)]
    pub attachments: Vec<PlaywrightAttachment>,
    #[serde(default)]
    pub stdout: Vec<OutputChunk>,
    #[serde(default)]
    pub stderr: Vec<OutputChunk>,
}

#[derive(Debug, Deserialize)]
pub struct PlaywrightError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaywrightAttachment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Captured output: a plain string or a `{ text }` / `{ buffer }` chunk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OutputChunk {
    Text(String),
    Chunk { text: String },
    Other(JsonValue),
}

impl OutputChunk {
    fn text(&self) -> &str {
        match self {
            OutputChunk::Text(text) | OutputChunk::Chunk { text } => text,
            OutputChunk::Other(_) => "",
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a runner document into normalized case entries.
///
/// A case passes iff its own `ok` flag is true; `ok` cases whose every
/// attempt was skipped are reported as skipped.
pub fn parse(raw: &str) -> AppResult<ParsedRun> {
    let value: JsonValue = serde_json::from_str(raw.trim())
        .map_err(|e| AppError::ExtractionFailed(format!("Runner output is not JSON: {}", e)))?;
    let report: PlaywrightReport = serde_json::from_value(value.clone()).map_err(|e| {
        AppError::ExtractionFailed(format!("Runner output is not a result document: {}", e))
    })?;

    let mut cases = Vec::new();
    let mut path = Vec::new();
    for suite in &report.suites {
        walk_suite(suite, &mut path, &mut cases);
    }

    Ok(ParsedRun { raw: value, cases })
}

fn walk_suite(suite: &PlaywrightSuite, path: &mut Vec<String>, cases: &mut Vec<ParsedCase>) {
    path.push(suite.title.clone());
    for spec in &suite.specs {
        cases.push(normalize_spec(spec, path));
    }
    for nested in &suite.suites {
        walk_suite(nested, path, cases);
    }
    path.pop();
}

fn normalize_spec(spec: &PlaywrightSpec, path: &[String]) -> ParsedCase {
    let last = spec.tests.iter().flat_map(|t| t.results.iter()).last();

    let all_skipped = spec
        .tests
        .iter()
        .flat_map(|t| t.results.iter())
        .map(|r| r.status.as_deref())
        .fold(None, |acc, status| {
            Some(acc.unwrap_or(true) && status == Some("skipped"))
        })
        .unwrap_or(false);
    let status = if spec.ok && all_skipped {
        TestStatus::Skipped
    } else {
        TestStatus::from_ok(spec.ok)
    };

    let duration = spec
        .duration
        .or_else(|| last.and_then(|r| r.duration))
        .map(|ms| ms.round() as i64);

    let error_message = if spec.ok {
        None
    } else {
        spec.error
            .as_ref()
            .and_then(|e| e.message.clone())
            .or_else(|| {
                last.and_then(|r| {
                    r.error
                        .iter()
                        .chain(r.errors.iter())
                        .find_map(|e| e.message.clone())
                })
            })
    };

    let screenshot_path = spec
        .attachments
        .iter()
        .find_map(|a| a.path.clone())
        .or_else(|| {
            last.and_then(|r| {
                r.attachments
                    .iter()
                    .filter(|a| is_screenshot(a))
                    .find_map(|a| a.path.clone())
            })
        });

    let video_path = spec.video.clone().or_else(|| {
        last.and_then(|r| {
            r.attachments
                .iter()
                .filter(|a| a.name == "video")
                .find_map(|a| a.path.clone())
        })
    });

    let (stdout, stderr) = if spec.stdout.is_empty() && spec.stderr.is_empty() {
        last.map(|r| (r.stdout.as_slice(), r.stderr.as_slice()))
            .unwrap_or_default()
    } else {
        (spec.stdout.as_slice(), spec.stderr.as_slice())
    };
    let logs: String = stdout.iter().chain(stderr.iter()).map(OutputChunk::text).collect();

    ParsedCase {
        suite_path: path.to_vec(),
        title: spec.title.clone(),
        status,
        duration,
        error_message,
        screenshot_path,
        video_path,
        logs: (!logs.is_empty()).then_some(logs),
    }
}

fn is_screenshot(attachment: &PlaywrightAttachment) -> bool {
    attachment.name == "screenshot"
        || attachment
            .content_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"))
}

// ============================================================================
// Case matching
// ============================================================================

/// Lookup from (suite name, case name) to test case id.
#[derive(Debug, Default)]
pub struct CaseIndex {
    by_name: HashMap<(String, String), Uuid>,
}

impl CaseIndex {
    pub fn new(suites: &[TestSuite]) -> Self {
        let mut by_name = HashMap::new();
        for suite in suites {
            for case in &suite.test_cases {
                by_name
                    .entry((suite.name.clone(), case.name.clone()))
                    .or_insert(case.id);
            }
        }
        Self { by_name }
    }

    /// Test case a parsed entry belongs to: a suite named in its describe
    /// path that owns a case titled like the entry.
    pub fn resolve(&self, case: &ParsedCase) -> Option<Uuid> {
        case.suite_path.iter().find_map(|suite| {
            self.by_name
                .get(&(suite.clone(), case.title.clone()))
                .copied()
        })
    }

    /// Pair every parsed entry with its test case, logging and dropping the
    /// entries that match none.
    pub fn match_cases<'a>(&self, run: &'a ParsedRun) -> Vec<(Uuid, &'a ParsedCase)> {
        run.cases
            .iter()
            .filter_map(|case| match self.resolve(case) {
                Some(id) => Some((id, case)),
                None => {
                    warn!(
                        "Runner reported '{}' under {:?}, which matches no test case",
                        case.title, case.suite_path
                    );
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Summary over a set of executions.
///
/// `completed` counts as passed and `failed` as failed; pending, running and
/// cancelled executions only count towards `total`.
pub fn aggregate_statistics(executions: &[TestExecution]) -> ExecutionStatistics {
    if executions.is_empty() {
        return ExecutionStatistics::empty();
    }

    let total = executions.len() as u64;
    let passed_count = executions
        .iter()
        .filter(|e| e.status == ExecutionStatus::Completed)
        .count() as u64;
    let failed_count = executions
        .iter()
        .filter(|e| e.status == ExecutionStatus::Failed)
        .count() as u64;

    let durations: Vec<f64> = executions
        .iter()
        .filter_map(TestExecution::duration_seconds)
        .collect();
    let average_duration_seconds = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };

    ExecutionStatistics {
        total,
        passed_count,
        failed_count,
        average_duration_seconds,
        success_rate_percent: passed_count as f64 / total as f64 * 100.0,
    }
}
