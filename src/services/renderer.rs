//! Template renderer: page objects, test specs and runner configuration.
//!
//! All renderers are pure functions of their inputs. Output never contains
//! timestamps or ids and every collection is walked in a fixed order, so the
//! same snapshot always renders to the same bytes.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ExpectedResult, GenerationConfig, Page, RawTestStep, TestCase, TestStep, TestSuite,
    validate_steps,
};
use crate::services::naming::{to_accessor_name, to_class_name};
use crate::services::step_compiler::{compile, ts_string};

/// Relative import path of the assertion helper from a spec file.
pub const ASSERTIONS_IMPORT: &str = "./helpers/assertions";

/// Member names the page object template defines itself.
const RESERVED_MEMBERS: [&str; 4] = ["page", "frame", "waitUntilReady", "constructor"];

/// Immutable rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Indentation unit
    pub indent: String,
    /// `testDir` written into the runner configuration
    pub test_dir: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            indent: "  ".to_string(),
            test_dir: "./tests".to_string(),
        }
    }
}

/// Renders generated source files.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    options: RenderOptions,
}

impl TemplateRenderer {
    pub fn new(options: RenderOptions) -> Self {
        TemplateRenderer { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn pad(&self, depth: usize) -> String {
        self.options.indent.repeat(depth)
    }

    // ========================================================================
    // Page objects
    // ========================================================================

    /// Page object class exposing one locator accessor per selector, in
    /// declaration order.
    pub fn render_page_object(&self, page: &Page) -> AppResult<String> {
        page.validate()?;

        let class_name = to_class_name(&page.name);
        if class_name.is_empty() {
            return Err(AppError::Compilation(format!(
                "Page name '{}' yields an empty class name",
                page.name
            )));
        }

        let mut members: HashSet<String> = RESERVED_MEMBERS.iter().map(|m| m.to_string()).collect();
        let mut accessors = Vec::with_capacity(page.selectors.len());
        for (key, selector) in page.selectors.iter() {
            let accessor = to_accessor_name(key);
            if accessor.is_empty() || !members.insert(accessor.clone()) {
                return Err(AppError::Compilation(format!(
                    "Selector '{}' on page '{}' does not map to a unique accessor name",
                    key, page.name
                )));
            }
            accessors.push((accessor, selector));
        }

        let (p1, p2) = (self.pad(1), self.pad(2));
        let mut out = String::new();
        writeln!(
            out,
            "import {{ type Page, type Locator, type FrameLocator }} from '@playwright/test';"
        )
        .ok();
        out.push('\n');
        if let Some(description) = &page.description {
            writeln!(out, "/** {} */", doc_comment(description)).ok();
        }
        writeln!(out, "export class {} {{", class_name).ok();
        writeln!(
            out,
            "{}static readonly URL_PATTERN = {};",
            p1,
            ts_string(&page.url_pattern)
        )
        .ok();
        out.push('\n');
        writeln!(out, "{}constructor(private readonly page: Page) {{}}", p1).ok();

        for (accessor, selector) in &accessors {
            out.push('\n');
            writeln!(
                out,
                "{}/** {}: {} */",
                p1,
                selector.kind,
                doc_comment(&selector.value)
            )
            .ok();
            writeln!(out, "{}get {}(): Locator {{", p1, accessor).ok();
            writeln!(
                out,
                "{}return this.page.locator({});",
                p2,
                ts_string(&selector.locator())
            )
            .ok();
            writeln!(out, "{}}}", p1).ok();
        }

        if let Some(iframe) = &page.iframe_selector {
            out.push('\n');
            writeln!(out, "{}get frame(): FrameLocator {{", p1).ok();
            writeln!(out, "{}return this.page.frameLocator({});", p2, ts_string(iframe)).ok();
            writeln!(out, "{}}}", p1).ok();
        }

        if !page.wait_conditions.is_empty() {
            out.push('\n');
            writeln!(out, "{}async waitUntilReady(): Promise<void> {{", p1).ok();
            for condition in &page.wait_conditions {
                let locator = page
                    .selectors
                    .get(&condition.selector)
                    .map(|s| s.locator())
                    .unwrap_or_else(|| condition.selector.clone());
                writeln!(
                    out,
                    "{}await this.page.locator({}).waitFor({{ state: {}, timeout: {} }});",
                    p2,
                    ts_string(&locator),
                    ts_string(condition.state()?),
                    u64::from(condition.timeout) * 1000
                )
                .ok();
            }
            writeln!(out, "{}}}", p1).ok();
        }

        writeln!(out, "}}").ok();
        Ok(out)
    }

    // ========================================================================
    // Test specs
    // ========================================================================

    /// One `test.describe` per suite wrapping one described block per case.
    ///
    /// `pages` must contain every page a step references by id.
    pub fn render_test_spec(
        &self,
        suite: &TestSuite,
        pages: &HashMap<Uuid, Page>,
    ) -> AppResult<String> {
        let needs_assertions = suite
            .test_cases
            .iter()
            .any(|c| c.expected_results.as_ref().is_some_and(|r| !r.is_empty()));

        let mut out = String::new();
        writeln!(out, "import {{ test, expect }} from '@playwright/test';").ok();
        if needs_assertions {
            writeln!(out, "import {{ assertExpected }} from '{}';", ASSERTIONS_IMPORT).ok();
        }
        out.push('\n');
        writeln!(out, "test.describe({}, () => {{", ts_string(&suite.name)).ok();

        for (index, case) in suite.test_cases.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            self.render_case(&mut out, case, pages).map_err(|e| match e {
                AppError::UnknownAction(_) | AppError::InvalidStep(_) => e,
                other => AppError::Compilation(format!(
                    "Test case '{}' in suite '{}': {}",
                    case.name, suite.name, other
                )),
            })?;
        }

        writeln!(out, "}});").ok();
        Ok(out)
    }

    fn render_case(
        &self,
        out: &mut String,
        case: &TestCase,
        pages: &HashMap<Uuid, Page>,
    ) -> AppResult<()> {
        let (p1, p2) = (self.pad(1), self.pad(2));
        let title = ts_string(&case.name);

        writeln!(out, "{}test.describe({}, () => {{", p1, title).ok();

        if let Some(before) = case.before_each.as_deref().filter(|s| !s.is_empty()) {
            writeln!(out, "{}test.beforeEach(async ({{ page }}) => {{", p2).ok();
            self.render_steps(out, before, pages, 3)?;
            writeln!(out, "{}}});", p2).ok();
            out.push('\n');
        }

        if let Some(after) = case.after_each.as_deref().filter(|s| !s.is_empty()) {
            writeln!(out, "{}test.afterEach(async ({{ page }}) => {{", p2).ok();
            self.render_steps(out, after, pages, 3)?;
            writeln!(out, "{}}});", p2).ok();
            out.push('\n');
        }

        let test_fn = if case.is_enabled { "test" } else { "test.skip" };
        writeln!(out, "{}{}({}, async ({{ page }}) => {{", p2, test_fn, title).ok();
        if let Some(description) = &case.description {
            writeln!(out, "{}// {}", self.pad(3), single_line(description)).ok();
        }
        self.render_steps(out, &case.steps, pages, 3)?;
        if let Some(expected) = &case.expected_results {
            for result in expected {
                writeln!(out, "{}{}", self.pad(3), render_expectation(result)).ok();
            }
        }
        writeln!(out, "{}}});", p2).ok();

        writeln!(out, "{}}});", p1).ok();
        Ok(())
    }

    fn render_steps(
        &self,
        out: &mut String,
        raw: &[RawTestStep],
        pages: &HashMap<Uuid, Page>,
        depth: usize,
    ) -> AppResult<()> {
        let pad = self.pad(depth);
        for step in validate_steps(raw)? {
            let step = resolve_selector(&step, pages)?;
            if let Some(description) = &step.description {
                writeln!(out, "{}// {}", pad, single_line(description)).ok();
            }
            writeln!(out, "{}{}", pad, compile(&step)).ok();
        }
        Ok(())
    }

    // ========================================================================
    // Runner configuration
    // ========================================================================

    /// `playwright.config.ts` with one project per configured browser.
    pub fn render_config(&self, config: &GenerationConfig) -> String {
        let (p1, p2, p3) = (self.pad(1), self.pad(2), self.pad(3));
        let mut out = String::new();

        writeln!(out, "import {{ defineConfig }} from '@playwright/test';").ok();
        out.push('\n');
        writeln!(out, "export default defineConfig({{").ok();
        writeln!(out, "{}testDir: {},", p1, ts_string(&self.options.test_dir)).ok();
        writeln!(out, "{}timeout: {},", p1, config.timeout).ok();
        writeln!(out, "{}retries: {},", p1, config.retries).ok();
        if let Some(workers) = config.workers {
            writeln!(out, "{}workers: {},", p1, workers).ok();
        }

        let reporters: Vec<String> = config
            .reporter
            .iter()
            .map(|r| {
                if r.options.is_empty() {
                    format!("[{}]", ts_string(&r.name))
                } else {
                    let options = serde_json::Value::Object(r.options.clone());
                    format!("[{}, {}]", ts_string(&r.name), options)
                }
            })
            .collect();
        writeln!(out, "{}reporter: [{}],", p1, reporters.join(", ")).ok();

        writeln!(out, "{}use: {{", p1).ok();
        writeln!(out, "{}headless: {},", p2, config.headless).ok();
        writeln!(
            out,
            "{}viewport: {{ width: {}, height: {} }},",
            p2, config.viewport.width, config.viewport.height
        )
        .ok();
        writeln!(out, "{}screenshot: {},", p2, ts_string(config.screenshot.as_str())).ok();
        writeln!(out, "{}}},", p1).ok();

        writeln!(out, "{}projects: [", p1).ok();
        for browser in &config.browsers {
            let name = ts_string(browser.as_str());
            writeln!(out, "{}{{", p2).ok();
            writeln!(out, "{}name: {},", p3, name).ok();
            writeln!(out, "{}use: {{ browserName: {} }},", p3, name).ok();
            writeln!(out, "{}}},", p2).ok();
        }
        writeln!(out, "{}],", p1).ok();
        writeln!(out, "}});").ok();
        out
    }

    /// `package.json` for the generated project.
    pub fn render_package_json(&self, project_name: &str) -> String {
        let package = serde_json::json!({
            "name": project_name,
            "version": "1.0.0",
            "private": true,
            "scripts": {
                "test": "playwright test",
                "test:headed": "playwright test --headed",
                "report": "playwright show-report"
            },
            "devDependencies": {
                "@playwright/test": "^1.40.0"
            }
        });
        // Map keys are sorted, so the output is stable
        let mut out = serde_json::to_string_pretty(&package).unwrap_or_default();
        out.push('\n');
        out
    }

    /// Runner-side implementation of `expected_results` comparisons.
    pub fn render_assertion_helper(&self) -> String {
        ASSERTION_HELPER.to_string()
    }
}

/// Replace a page-scoped selector key with that selector's locator.
fn resolve_selector(step: &TestStep, pages: &HashMap<Uuid, Page>) -> AppResult<TestStep> {
    let Some(page_id) = step.page_id else {
        return Ok(step.clone());
    };
    let page = pages
        .get(&page_id)
        .ok_or_else(|| AppError::NotFound(format!("Page {}", page_id)))?;
    Ok(match page.selectors.get(&step.selector) {
        Some(selector) => step.with_selector(selector.locator()),
        None => step.clone(),
    })
}

fn render_expectation(result: &ExpectedResult) -> String {
    format!(
        "await assertExpected(page, {}, {}, {});",
        ts_string(&result.selector),
        ts_string(&result.comparison_type),
        result.expected_value
    )
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text safe inside a `/** ... */` block; `*/` would close it early.
fn doc_comment(text: &str) -> String {
    single_line(text).replace("*/", "*\\/")
}

const ASSERTION_HELPER: &str = r#"import { expect, type Page } from '@playwright/test';

export async function assertExpected(
  page: Page,
  selector: string,
  comparison: string,
  expected: unknown,
): Promise<void> {
  const locator = page.locator(selector);
  switch (comparison) {
    case 'equals':
      await expect(locator).toHaveText(String(expected));
      break;
    case 'contains':
      await expect(locator).toContainText(String(expected));
      break;
    case 'regex':
      await expect(locator).toHaveText(new RegExp(String(expected)));
      break;
    case 'visible':
      await expect(locator).toBeVisible();
      break;
    case 'hidden':
      await expect(locator).toBeHidden();
      break;
    case 'count':
      await expect(locator).toHaveCount(Number(expected));
      break;
    default:
      throw new Error(`Unsupported comparison type: ${comparison}`);
  }
}
"#;
