//! Execution statistics model.

use serde::{Deserialize, Serialize};

/// Summary statistics over a set of executions.
///
/// `average_duration_seconds` is the mean wall-clock span (`end_time -
/// start_time`) of whole executions, so it includes workspace setup and
/// runner start-up, not just time spent inside test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    /// Number of executions considered
    pub total: u64,
    /// Executions that ended `completed`
    pub passed_count: u64,
    /// Executions that ended `failed`
    pub failed_count: u64,
    /// Mean over executions with both timestamps set; 0 when none qualify
    pub average_duration_seconds: f64,
    /// `passed_count / total * 100`, or 0 when `total` is 0
    pub success_rate_percent: f64,
}

impl ExecutionStatistics {
    /// Statistics for an empty set.
    pub fn empty() -> Self {
        ExecutionStatistics {
            total: 0,
            passed_count: 0,
            failed_count: 0,
            average_duration_seconds: 0.0,
            success_rate_percent: 0.0,
        }
    }
}
