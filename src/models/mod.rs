//! Domain models for browser test compilation and execution.

pub mod execution;
pub mod execution_event;
pub mod execution_stats;
pub mod generation;
pub mod page;
pub mod test_result;
pub mod test_step;
pub mod test_suite;

// Re-export commonly used types
pub use execution::{
    BrowserType, ExecutionFilter, ExecutionStatus, ExecutionUpdate, NewExecution, TestExecution,
};
pub use execution_event::{ExecutionEvent, ExecutionEventMessage};
pub use execution_stats::ExecutionStatistics;
pub use generation::{GeneratedProject, GenerationConfig, Reporter, ScreenshotMode, Viewport};
pub use page::{Page, Selector, SelectorKind, SelectorMap, WaitCondition, validate_url_pattern};
pub use test_result::{ParsedCase, ParsedRun, TestResult, TestStatus};
pub use test_step::{RawTestStep, StepAction, TestStep, validate_steps};
pub use test_suite::{ExpectedResult, Project, TestCase, TestSuite};
