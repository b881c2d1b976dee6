//! Execution and result records for the in-memory store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ExecutionFilter, ExecutionUpdate, TestExecution, TestResult};

use super::{ExecutionStore, MemoryDb};

#[async_trait]
impl ExecutionStore for MemoryDb {
    async fn create_execution(&self, execution: TestExecution) -> AppResult<TestExecution> {
        let mut tables = self.tables.write().await;
        if tables.executions.contains_key(&execution.id) {
            return Err(AppError::InvalidInput(format!(
                "Execution {} already exists",
                execution.id
            )));
        }
        tables.executions.insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn get_execution(&self, id: Uuid) -> AppResult<Option<TestExecution>> {
        Ok(self.tables.read().await.executions.get(&id).cloned())
    }

    async fn update_execution(
        &self,
        id: Uuid,
        update: ExecutionUpdate,
    ) -> AppResult<TestExecution> {
        let mut tables = self.tables.write().await;
        let execution = tables
            .executions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Execution {}", id)))?;
        execution.apply(&update);
        Ok(execution.clone())
    }

    async fn list_executions(&self, filter: &ExecutionFilter) -> AppResult<Vec<TestExecution>> {
        let tables = self.tables.read().await;
        let mut executions: Vec<TestExecution> = tables
            .executions
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        // UUIDv7 is time-ordered
        executions.sort_by_key(|e| e.id);
        Ok(executions)
    }

    async fn insert_test_result(&self, result: TestResult) -> AppResult<TestResult> {
        let mut tables = self.tables.write().await;
        if !tables.executions.contains_key(&result.execution_id) {
            return Err(AppError::NotFound(format!(
                "Execution {}",
                result.execution_id
            )));
        }
        tables.results.push(result.clone());
        Ok(result)
    }

    async fn get_test_results(&self, execution_id: Uuid) -> AppResult<Vec<TestResult>> {
        Ok(self
            .tables
            .read()
            .await
            .results
            .iter()
            .filter(|r| r.execution_id == execution_id)
            .cloned()
            .collect())
    }
}
