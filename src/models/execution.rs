//! Test execution domain models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Browser engine the runner drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chromium" => Some(Self::Chromium),
            "firefox" => Some(Self::Firefox),
            "webkit" => Some(Self::Webkit),
            _ => None,
        }
    }
}

impl std::fmt::Display for BrowserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution status.
///
/// `pending` and `running` are the only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    /// Validate a transition, returning the new status.
    pub fn transition_to(&self, next: ExecutionStatus) -> AppResult<ExecutionStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tracked attempt to run generated test code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecution {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_suite_id: Option<Uuid>,
    pub status: ExecutionStatus,
    pub browser_type: BrowserType,
    /// Extra environment variables for the runner process
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Raw parsed runner output
    pub results: Option<JsonValue>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestExecution {
    /// Wall-clock duration, if both timestamps are set.
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// Apply a partial update. No transition checks happen here.
    pub fn apply(&mut self, update: &ExecutionUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(start_time) = update.start_time {
            self.start_time = Some(start_time);
        }
        if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(results) = &update.results {
            self.results = Some(results.clone());
        }
        if let Some(error_message) = &update.error_message {
            self.error_message = Some(error_message.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Request to schedule a new execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewExecution {
    pub project_id: Uuid,
    #[serde(default)]
    pub test_suite_id: Option<Uuid>,
    #[serde(default = "default_browser")]
    pub browser_type: BrowserType,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

fn default_browser() -> BrowserType {
    BrowserType::Chromium
}

impl NewExecution {
    pub fn for_project(project_id: Uuid) -> Self {
        NewExecution {
            project_id,
            test_suite_id: None,
            browser_type: BrowserType::Chromium,
            environment: BTreeMap::new(),
        }
    }

    pub fn for_suite(project_id: Uuid, suite_id: Uuid) -> Self {
        NewExecution {
            test_suite_id: Some(suite_id),
            ..Self::for_project(project_id)
        }
    }

    pub fn with_browser(mut self, browser_type: BrowserType) -> Self {
        self.browser_type = browser_type;
        self
    }

    /// Materialize a pending record.
    pub fn into_execution(self) -> TestExecution {
        let now = Utc::now();
        TestExecution {
            id: Uuid::now_v7(),
            project_id: self.project_id,
            test_suite_id: self.test_suite_id,
            status: ExecutionStatus::Pending,
            browser_type: self.browser_type,
            environment: self.environment,
            start_time: None,
            end_time: None,
            results: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionUpdate {
    pub status: Option<ExecutionStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub results: Option<JsonValue>,
    pub error_message: Option<String>,
}

impl ExecutionUpdate {
    pub fn status(status: ExecutionStatus) -> Self {
        ExecutionUpdate {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Listing filter; every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionFilter {
    pub project_id: Option<Uuid>,
    pub test_suite_id: Option<Uuid>,
    pub status: Option<ExecutionStatus>,
    /// Inclusive lower bound on `created_at`
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub end_date: Option<DateTime<Utc>>,
}

impl ExecutionFilter {
    pub fn matches(&self, execution: &TestExecution) -> bool {
        self.project_id.is_none_or(|id| execution.project_id == id)
            && self
                .test_suite_id
                .is_none_or(|id| execution.test_suite_id == Some(id))
            && self.status.is_none_or(|s| execution.status == s)
            && self.start_date.is_none_or(|d| execution.created_at >= d)
            && self.end_date.is_none_or(|d| execution.created_at <= d)
    }
}
