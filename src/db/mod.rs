//! Data access: collaborator interfaces plus an in-memory implementation.
//!
//! Entity storage (pages, suites, projects) lives outside this crate; the
//! pipeline only reads snapshots through [`EntitySource`] and writes
//! execution records through [`ExecutionStore`].

pub mod entities;
pub mod test_executions;

pub use entities::EntityBundle;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    ExecutionFilter, ExecutionUpdate, Page, Project, TestExecution, TestResult, TestSuite,
};

/// Read-only access to validated entity snapshots.
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn get_page(&self, id: Uuid) -> AppResult<Option<Page>>;

    /// Suite with all of its cases.
    async fn get_test_suite_with_cases(&self, id: Uuid) -> AppResult<Option<TestSuite>>;

    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>>;
}

/// Persistence for execution and result records.
///
/// Each call is atomic on its own; nothing serializes a read followed by a
/// write, so concurrent updates to one record are last-write-wins.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(&self, execution: TestExecution) -> AppResult<TestExecution>;

    async fn get_execution(&self, id: Uuid) -> AppResult<Option<TestExecution>>;

    /// Apply a partial update without transition checks.
    async fn update_execution(&self, id: Uuid, update: ExecutionUpdate)
    -> AppResult<TestExecution>;

    /// Executions matching the filter, oldest first.
    async fn list_executions(&self, filter: &ExecutionFilter) -> AppResult<Vec<TestExecution>>;

    async fn insert_test_result(&self, result: TestResult) -> AppResult<TestResult>;

    async fn get_test_results(&self, execution_id: Uuid) -> AppResult<Vec<TestResult>>;
}

#[derive(Default)]
struct MemoryTables {
    pages: HashMap<Uuid, Page>,
    suites: HashMap<Uuid, TestSuite>,
    projects: HashMap<Uuid, Project>,
    executions: HashMap<Uuid, TestExecution>,
    results: Vec<TestResult>,
}

/// In-memory store implementing both collaborator interfaces.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<MemoryTables>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}
