//! Business logic services.

pub mod cleanup;
pub mod event_broadcaster;
pub mod extraction;
pub mod naming;
pub mod orchestrator;
pub mod renderer;
pub mod runner;
pub mod scaffold;
pub mod step_compiler;

pub use cleanup::{CleanupConfig, start_cleanup_task};
pub use event_broadcaster::EventBroadcaster;
pub use orchestrator::{ExecutionOrchestrator, OrchestratorSettings};
pub use renderer::{RenderOptions, TemplateRenderer};
pub use runner::{PlaywrightRunner, RunnerAdapter, RunnerOutcome, RunnerOutput, RunnerRequest};
pub use scaffold::ProjectScaffolder;
