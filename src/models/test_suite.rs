//! Test suite, test case and project snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use super::test_step::RawTestStep;

/// Post-step check on an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedResult {
    pub selector: String,
    pub expected_value: JsonValue,
    /// Passed through to the runner untouched (equals, contains, regex, ...)
    #[serde(default = "default_comparison_type")]
    pub comparison_type: String,
}

fn default_comparison_type() -> String {
    "equals".to_string()
}

fn default_enabled() -> bool {
    true
}

/// Test case belonging to exactly one suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Execution order
    #[serde(default)]
    pub steps: Vec<RawTestStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_each: Option<Vec<RawTestStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_each: Option<Vec<RawTestStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_results: Option<Vec<ExpectedResult>>,
    /// Disabled cases are generated as skipped tests.
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

impl TestCase {
    pub fn new(name: impl Into<String>, steps: Vec<RawTestStep>) -> Self {
        TestCase {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            steps,
            before_each: None,
            after_each: None,
            expected_results: None,
            is_enabled: true,
        }
    }

    /// Every step of the case, hooks included, in hook/body/hook order.
    pub fn all_steps(&self) -> impl Iterator<Item = &RawTestStep> {
        self.before_each
            .iter()
            .flatten()
            .chain(self.steps.iter())
            .chain(self.after_each.iter().flatten())
    }
}

/// Test suite with its cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque bag consumed by runner configuration generation.
    #[serde(default)]
    pub configuration: Map<String, JsonValue>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(project_id: Uuid, name: impl Into<String>, test_cases: Vec<TestCase>) -> Self {
        TestSuite {
            id: Uuid::now_v7(),
            project_id,
            name: name.into(),
            description: None,
            configuration: Map::new(),
            test_cases,
        }
    }

    /// Distinct page ids referenced by any step, in first-reference order.
    pub fn referenced_page_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for case in &self.test_cases {
            for step in case.all_steps() {
                if let Some(id) = step.page_id
                    && !ids.contains(&id)
                {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// Project snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Suites a project-wide run compiles, in order.
    #[serde(default)]
    pub suite_ids: Vec<Uuid>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            suite_ids: Vec::new(),
        }
    }
}
