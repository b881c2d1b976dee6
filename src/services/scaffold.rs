//! Project scaffolder: lays out a generated project and writes its files.
//!
//! Generation renders every artifact in memory first. A compile failure in
//! any suite or page therefore aborts the call before the first byte is
//! written; only I/O errors can leave earlier files of the call on disk.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::{Map, Value as JsonValue};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::EntitySource;
use crate::error::{AppError, AppResult};
use crate::models::{GeneratedProject, GenerationConfig, Page, TestSuite};
use crate::services::naming::to_file_name;
use crate::services::renderer::TemplateRenderer;

/// Directory skeleton created under every output root.
pub const LAYOUT_DIRS: [&str; 4] = ["tests", "tests/pages", "tests/fixtures", "tests/helpers"];

pub const CONFIG_FILE: &str = "playwright.config.ts";
pub const PACKAGE_FILE: &str = "package.json";
pub const ASSERTIONS_FILE: &str = "tests/helpers/assertions.ts";

/// `name` written into the generated `package.json`.
const PACKAGE_NAME: &str = "playwright-tests";

/// Relative path of a page object file.
pub fn page_object_path(page: &Page) -> AppResult<String> {
    Ok(format!("tests/pages/{}_page.ts", file_stem("Page", &page.name)?))
}

/// Relative path of a suite's spec file.
pub fn spec_path(suite: &TestSuite) -> AppResult<String> {
    Ok(format!("tests/{}.spec.ts", file_stem("Suite", &suite.name)?))
}

/// File stem for `name`; names without ASCII letters or digits have none.
fn file_stem(kind: &str, name: &str) -> AppResult<String> {
    let stem = to_file_name(name);
    if !stem.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Compilation(format!(
            "{} name '{}' yields an empty file name",
            kind, name
        )));
    }
    Ok(stem)
}

/// A rendered file not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedFile {
    relative_path: String,
    content: String,
    kind: FileKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    PageObject,
    Spec,
    Support,
    Config,
}

/// Writes generated projects for suites read from an [`EntitySource`].
#[derive(Clone)]
pub struct ProjectScaffolder {
    entities: Arc<dyn EntitySource>,
    renderer: TemplateRenderer,
}

impl ProjectScaffolder {
    pub fn new(entities: Arc<dyn EntitySource>, renderer: TemplateRenderer) -> Self {
        Self { entities, renderer }
    }

    /// Create the directory skeleton. Existing directories are fine.
    pub async fn create_layout(&self, root: &Path) -> AppResult<()> {
        for dir in LAYOUT_DIRS {
            let path = root.join(dir);
            tokio::fs::create_dir_all(&path).await.map_err(|e| {
                AppError::FileSystem(format!(
                    "Failed to create directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Write one file below `root`, returning its absolute path.
    ///
    /// The handle is dropped on every path, including write errors.
    pub async fn write_artifact(
        &self,
        root: &Path,
        relative_path: &str,
        content: &str,
    ) -> AppResult<PathBuf> {
        let relative = Path::new(relative_path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(AppError::InvalidOutputPath(format!(
                "Artifact path '{}' must stay inside the output root",
                relative_path
            )));
        }

        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::FileSystem(format!(
                    "Failed to create directory for {}: {}",
                    relative_path, e
                ))
            })?;
        }

        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            AppError::FileSystem(format!("Failed to create file {}: {}", relative_path, e))
        })?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| AppError::FileSystem(format!("Failed to write file {}: {}", relative_path, e)))?;
        file.flush()
            .await
            .map_err(|e| AppError::FileSystem(format!("Failed to flush file {}: {}", relative_path, e)))?;

        debug!("Wrote {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }

    /// Generate a project for `suite_ids` under the absolute `root`.
    ///
    /// Runner configuration is the defaults overlaid by each suite's
    /// `configuration` in request order, then by `overrides`.
    pub async fn generate_project(
        &self,
        suite_ids: &[Uuid],
        root: &Path,
        overrides: &Map<String, JsonValue>,
    ) -> AppResult<GeneratedProject> {
        self.generate_with_suites(suite_ids, root, overrides)
            .await
            .map(|(generated, _)| generated)
    }

    /// [`Self::generate_project`], also returning the suite snapshots the
    /// files were rendered from, in request order.
    pub async fn generate_with_suites(
        &self,
        suite_ids: &[Uuid],
        root: &Path,
        overrides: &Map<String, JsonValue>,
    ) -> AppResult<(GeneratedProject, Vec<TestSuite>)> {
        if !root.is_absolute() {
            return Err(AppError::InvalidOutputPath(format!(
                "Output root '{}' is not absolute",
                root.display()
            )));
        }

        let (plan, suites) = self.plan(suite_ids, overrides).await?;

        self.create_layout(root).await?;
        let mut generated = GeneratedProject {
            root: root.to_path_buf(),
            files: Vec::new(),
            config_files: Vec::new(),
            spec_files: Vec::new(),
        };
        for file in &plan {
            let path = self
                .write_artifact(root, &file.relative_path, &file.content)
                .await?;
            match file.kind {
                FileKind::Config => generated.config_files.push(path),
                FileKind::Spec => {
                    generated.spec_files.push(path.clone());
                    generated.files.push(path);
                }
                FileKind::PageObject | FileKind::Support => generated.files.push(path),
            }
        }

        info!(
            "Generated project at {}: {} files, {} config files",
            root.display(),
            generated.files.len(),
            generated.config_files.len()
        );
        Ok((generated, suites))
    }

    /// Fetch and render everything for one generation call.
    async fn plan(
        &self,
        suite_ids: &[Uuid],
        overrides: &Map<String, JsonValue>,
    ) -> AppResult<(Vec<PlannedFile>, Vec<TestSuite>)> {
        if suite_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one test suite is required".to_string(),
            ));
        }

        let suites = try_join_all(suite_ids.iter().map(|id| self.fetch_suite(*id))).await?;

        let mut page_ids = Vec::new();
        for suite in &suites {
            for id in suite.referenced_page_ids() {
                if !page_ids.contains(&id) {
                    page_ids.push(id);
                }
            }
        }
        let pages = try_join_all(page_ids.iter().map(|id| self.fetch_page(*id))).await?;

        let config = GenerationConfig::merged(
            suites
                .iter()
                .map(|s| &s.configuration)
                .chain(std::iter::once(overrides)),
        )?;

        let mut plan = Vec::with_capacity(pages.len() + suites.len() + 3);
        for page in &pages {
            plan.push(PlannedFile {
                relative_path: page_object_path(page)?,
                content: self.renderer.render_page_object(page)?,
                kind: FileKind::PageObject,
            });
        }

        let page_index: HashMap<Uuid, Page> = pages.into_iter().map(|p| (p.id, p)).collect();
        for suite in &suites {
            plan.push(PlannedFile {
                relative_path: spec_path(suite)?,
                content: self.renderer.render_test_spec(suite, &page_index)?,
                kind: FileKind::Spec,
            });
        }

        plan.push(PlannedFile {
            relative_path: ASSERTIONS_FILE.to_string(),
            content: self.renderer.render_assertion_helper(),
            kind: FileKind::Support,
        });
        plan.push(PlannedFile {
            relative_path: CONFIG_FILE.to_string(),
            content: self.renderer.render_config(&config),
            kind: FileKind::Config,
        });
        plan.push(PlannedFile {
            relative_path: PACKAGE_FILE.to_string(),
            content: self.renderer.render_package_json(PACKAGE_NAME),
            kind: FileKind::Config,
        });

        let mut seen = HashSet::new();
        for file in &plan {
            if !seen.insert(file.relative_path.as_str()) {
                return Err(AppError::Compilation(format!(
                    "Two generated artifacts map to the same file {}",
                    file.relative_path
                )));
            }
        }

        Ok((plan, suites))
    }

    async fn fetch_suite(&self, id: Uuid) -> AppResult<TestSuite> {
        self.entities
            .get_test_suite_with_cases(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test suite {}", id)))
    }

    async fn fetch_page(&self, id: Uuid) -> AppResult<Page> {
        self.entities
            .get_page(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page {}", id)))
    }
}
