//! Entity snapshot storage for the in-memory store.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Page, Project, TestSuite};

use super::{EntitySource, MemoryDb};

/// Serialized set of entities, as loaded by the CLIs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityBundle {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub suites: Vec<TestSuite>,
}

impl EntityBundle {
    /// Read a bundle from a JSON file.
    pub async fn read(path: &Path) -> AppResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::FileSystem(format!("Failed to read bundle {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl MemoryDb {
    /// Insert or replace a page after validating it.
    pub async fn put_page(&self, page: Page) -> AppResult<()> {
        page.validate()?;
        self.tables.write().await.pages.insert(page.id, page);
        Ok(())
    }

    pub async fn put_suite(&self, suite: TestSuite) {
        self.tables.write().await.suites.insert(suite.id, suite);
    }

    pub async fn put_project(&self, project: Project) {
        self.tables.write().await.projects.insert(project.id, project);
    }

    /// Load every entity in a bundle.
    pub async fn load_bundle(&self, bundle: EntityBundle) -> AppResult<()> {
        let (projects, pages, suites) = (
            bundle.projects.len(),
            bundle.pages.len(),
            bundle.suites.len(),
        );

        for page in bundle.pages {
            self.put_page(page).await?;
        }
        for suite in bundle.suites {
            self.put_suite(suite).await;
        }
        for project in bundle.projects {
            self.put_project(project).await;
        }

        info!(
            "Loaded bundle: {} projects, {} pages, {} suites",
            projects, pages, suites
        );
        Ok(())
    }
}

#[async_trait]
impl EntitySource for MemoryDb {
    async fn get_page(&self, id: Uuid) -> AppResult<Option<Page>> {
        Ok(self.tables.read().await.pages.get(&id).cloned())
    }

    async fn get_test_suite_with_cases(&self, id: Uuid) -> AppResult<Option<TestSuite>> {
        Ok(self.tables.read().await.suites.get(&id).cloned())
    }

    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }
}
