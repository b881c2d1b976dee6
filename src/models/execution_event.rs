//! Execution lifecycle events for subscribers (presentation layers, CLIs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution::{ExecutionStatus, TestExecution};

/// Event emitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A new execution was scheduled.
    ExecutionCreated(ExecutionCreatedPayload),
    /// An execution changed status.
    ExecutionUpdated(ExecutionUpdatedPayload),
    /// Per-case results were stored for an execution.
    ResultsAvailable(ResultsAvailablePayload),
}

/// Payload for execution_created event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionCreatedPayload {
    pub execution_id: Uuid,
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_suite_id: Option<Uuid>,
    pub browser_type: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for execution_updated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionUpdatedPayload {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Payload for results_available event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsAvailablePayload {
    pub execution_id: Uuid,
    pub passed: u32,
    pub failed: u32,
    pub total: u32,
}

/// Wrapper that includes timestamp with every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEventMessage {
    #[serde(flatten)]
    pub event: ExecutionEvent,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionEventMessage {
    /// Create a new event message with the current timestamp.
    pub fn new(event: ExecutionEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

impl ExecutionEvent {
    pub fn created(execution: &TestExecution) -> Self {
        ExecutionEvent::ExecutionCreated(ExecutionCreatedPayload {
            execution_id: execution.id,
            project_id: execution.project_id,
            test_suite_id: execution.test_suite_id,
            browser_type: execution.browser_type.to_string(),
            created_at: execution.created_at,
        })
    }

    pub fn updated(
        execution_id: Uuid,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Self {
        ExecutionEvent::ExecutionUpdated(ExecutionUpdatedPayload {
            execution_id,
            status,
            error_message,
        })
    }

    pub fn results_available(execution_id: Uuid, passed: u32, failed: u32, total: u32) -> Self {
        ExecutionEvent::ResultsAvailable(ResultsAvailablePayload {
            execution_id,
            passed,
            failed,
            total,
        })
    }

    /// Execution the event concerns.
    pub fn execution_id(&self) -> Uuid {
        match self {
            ExecutionEvent::ExecutionCreated(p) => p.execution_id,
            ExecutionEvent::ExecutionUpdated(p) => p.execution_id,
            ExecutionEvent::ResultsAvailable(p) => p.execution_id,
        }
    }
}
