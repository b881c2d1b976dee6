//! Compile-and-execute pipeline test suite.
//!
//! Drives generation and the orchestrator end to end against the in-memory
//! store, with a scripted runner in place of the Playwright process.
//!
//! Run with: cargo test --test pipeline

mod mock_runner;
mod test_helpers;

mod test_cancellation;
mod test_generation;
mod test_runs;
mod test_statistics;
