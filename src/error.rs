//! Domain error types for the test compiler and execution pipeline.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use crate::models::ExecutionStatus;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid input data (bad URL pattern, malformed selector map, bad config value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Step action outside the supported set
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Step is missing a field its action requires
    #[error("Invalid step: {0}")]
    InvalidStep(String),

    /// Referenced page, suite, case, project or execution is absent
    #[error("{0} not found")]
    NotFound(String),

    /// Template rendering or artifact planning failed
    #[error("Compilation error: {0}")]
    Compilation(String),

    /// Output root is not usable for generation
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// Forbidden execution status transition
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// File system operation failed
    #[error("File system error: {0}")]
    FileSystem(String),

    /// Runner output could not be parsed
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Runner process could not be spawned or awaited
    #[error("Runner error: {0}")]
    Runner(String),

    /// Runner process exceeded the configured wall-clock limit
    #[error("Timeout: runner did not finish within {0} seconds")]
    Timeout(u64),
}

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Surfaced synchronously, never retried.
    Validation,
    /// Surfaced synchronously.
    NotFound,
    /// Aborts the whole generation call.
    Compilation,
    /// Captured into the execution record, never thrown to the scheduler.
    Execution,
}

impl AppError {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::InvalidInput(_)
            | AppError::UnknownAction(_)
            | AppError::InvalidStep(_)
            | AppError::InvalidOutputPath(_)
            | AppError::InvalidTransition { .. } => ErrorCategory::Validation,
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::Compilation(_) => ErrorCategory::Compilation,
            AppError::FileSystem(_)
            | AppError::ExtractionFailed(_)
            | AppError::Runner(_)
            | AppError::Timeout(_) => ErrorCategory::Execution,
        }
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}
