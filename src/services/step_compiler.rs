//! Step compiler: one test step to one line of Playwright test code.
//!
//! Pure and I/O free. String arguments are emitted as JSON string literals,
//! which are valid TypeScript string literals with every quote and control
//! character escaped.

use serde_json::Value as JsonValue;

use crate::error::AppResult;
use crate::models::{RawTestStep, StepAction, TestStep};

/// Quote a string as a TypeScript literal.
pub fn ts_string(value: &str) -> String {
    JsonValue::String(value.to_string()).to_string()
}

/// Emit the runner call for a validated step.
pub fn compile(step: &TestStep) -> String {
    let selector = ts_string(&step.selector);
    match &step.action {
        StepAction::Click => format!("await page.click({});", selector),
        StepAction::Type { value } => {
            format!("await page.fill({}, {});", selector, ts_string(value))
        }
        StepAction::Select { value } => {
            format!("await page.selectOption({}, {});", selector, ts_string(value))
        }
        StepAction::Hover => format!("await page.hover({});", selector),
        StepAction::Wait => format!("await page.waitForSelector({});", selector),
        StepAction::Assert => format!("expect(await page.isVisible({})).toBeTruthy();", selector),
    }
}

/// Validate a stored step and compile it.
///
/// Fails with `UnknownAction` for actions outside the supported set and
/// with `InvalidStep` when a `type` or `select` step has no value.
pub fn compile_raw(raw: &RawTestStep) -> AppResult<String> {
    TestStep::try_from(raw).map(|step| compile(&step))
}
