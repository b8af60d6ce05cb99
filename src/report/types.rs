use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{ExecutionResult, Verdict};

/// Final aggregate of a completed suite run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub task_id: String,
    pub target: String,
    pub completed_at: DateTime<Utc>,
    pub total_candidates: usize,
    pub executed_tests: usize,
    /// Passed over executed, 0 when nothing ran
    pub success_rate: f64,
    pub execution_results: Vec<ExecutionResult>,
    /// Every result's artifacts, flattened in result order
    pub artifacts: Vec<String>,
}

impl TestReport {
    /// Pure aggregation; the same inputs always give the same report.
    pub fn assemble(
        task_id: &str,
        target: &str,
        total_candidates: usize,
        results: Vec<ExecutionResult>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let executed_tests = results.len();
        let passed = results.iter().filter(|r| r.is_pass()).count();
        let success_rate = if executed_tests == 0 {
            0.0
        } else {
            passed as f64 / executed_tests as f64
        };
        let artifacts = results
            .iter()
            .flat_map(|r| r.artifacts.iter().cloned())
            .collect();

        Self {
            task_id: task_id.to_string(),
            target: target.to_string(),
            completed_at,
            total_candidates,
            executed_tests,
            success_rate,
            execution_results: results,
            artifacts,
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_results(&self.execution_results)
    }
}

/// Derived statistics over a report's results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub total_duration_ms: u64,
    pub average_duration_ms: u64,
    pub fastest_ms: Option<u64>,
    pub slowest_ms: Option<u64>,
    pub artifact_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_common_error: Option<String>,
}

impl ReportSummary {
    pub fn from_results(results: &[ExecutionResult]) -> Self {
        let count = |v: Verdict| results.iter().filter(|r| r.verdict == v).count();
        let total_duration_ms: u64 = results.iter().map(|r| r.duration_ms).sum();
        let average_duration_ms = if results.is_empty() {
            0
        } else {
            total_duration_ms / results.len() as u64
        };

        // Ties go to the message seen first
        let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
        for (seen, msg) in results
            .iter()
            .filter_map(|r| r.error_message.as_deref())
            .enumerate()
        {
            tally.entry(msg).or_insert((0, seen)).0 += 1;
        }
        let most_common_error = tally
            .into_iter()
            .max_by(|(_, (a, a_seen)), (_, (b, b_seen))| a.cmp(b).then(b_seen.cmp(a_seen)))
            .map(|(msg, _)| msg.to_string());

        Self {
            passed: count(Verdict::Pass),
            failed: count(Verdict::Fail),
            errored: count(Verdict::Error),
            total_duration_ms,
            average_duration_ms,
            fastest_ms: results.iter().map(|r| r.duration_ms).min(),
            slowest_ms: results.iter().map(|r| r.duration_ms).max(),
            artifact_count: results.iter().map(|r| r.artifacts.len()).sum(),
            most_common_error,
        }
    }
}
