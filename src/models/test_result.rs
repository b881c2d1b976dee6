//! Test result models: per-case outcomes parsed from runner output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Per-case outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Runner-reported pass flag mapping.
    pub fn from_ok(ok: bool) -> Self {
        if ok { Self::Passed } else { Self::Failed }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted result row; written once by the execution that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub test_case_id: Uuid,
    pub status: TestStatus,
    /// Milliseconds
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TestResult {
    /// Build a row from a parsed case entry.
    pub fn from_case(execution_id: Uuid, test_case_id: Uuid, case: &ParsedCase) -> Self {
        TestResult {
            id: Uuid::now_v7(),
            execution_id,
            test_case_id,
            status: case.status,
            duration: case.duration,
            error_message: case.error_message.clone(),
            screenshot_path: case.screenshot_path.clone(),
            video_path: case.video_path.clone(),
            logs: case.logs.clone(),
            created_at: Utc::now(),
        }
    }
}

/// One normalized case entry from the runner document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCase {
    /// Titles of the enclosing suite groups, outermost first
    pub suite_path: Vec<String>,
    pub title: String,
    pub status: TestStatus,
    pub duration: Option<i64>,
    pub error_message: Option<String>,
    pub screenshot_path: Option<String>,
    pub video_path: Option<String>,
    /// Captured stdout followed by stderr
    pub logs: Option<String>,
}

/// A parsed runner document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRun {
    /// The document as produced by the runner
    pub raw: JsonValue,
    pub cases: Vec<ParsedCase>,
}

impl ParsedRun {
    pub fn passed(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| c.status == TestStatus::Passed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| c.status == TestStatus::Failed)
            .count()
    }
}
