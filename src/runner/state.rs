use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::report::types::TestReport;

/// Suite run phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuitePhase {
    Planning,
    Ranking,
    Executing,
    Reporting,
    Completed,
    Failed,
}

impl SuitePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SuitePhase::Completed | SuitePhase::Failed)
    }

    fn ordinal(&self) -> u8 {
        match self {
            SuitePhase::Planning => 0,
            SuitePhase::Ranking => 1,
            SuitePhase::Executing => 2,
            SuitePhase::Reporting => 3,
            SuitePhase::Completed => 4,
            SuitePhase::Failed => 5,
        }
    }

    /// Phases only move forward one step at a time; `Failed` is reachable
    /// from every non-terminal phase.
    pub fn can_advance_to(&self, next: SuitePhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == SuitePhase::Failed || next.ordinal() == self.ordinal() + 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuitePhase::Planning => "planning",
            SuitePhase::Ranking => "ranking",
            SuitePhase::Executing => "executing",
            SuitePhase::Reporting => "reporting",
            SuitePhase::Completed => "completed",
            SuitePhase::Failed => "failed",
        }
    }
}

impl fmt::Display for SuitePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest published status of a suite run (last write wins)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusObservation {
    pub phase: SuitePhase,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

impl StatusObservation {
    pub fn new(phase: SuitePhase, message: &str) -> Self {
        Self {
            phase,
            message: message.to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// One invocation of the whole pipeline
#[derive(Debug, Clone)]
pub struct SuiteRun {
    pub task_id: String,
    pub target: String,
    pub candidate_count: usize,
    pub execute_count: usize,
    pub status: StatusObservation,
    pub report: Option<TestReport>,
}

impl SuiteRun {
    pub fn new(task_id: &str, target: &str, candidate_count: usize, execute_count: usize) -> Self {
        Self {
            task_id: task_id.to_string(),
            target: target.to_string(),
            candidate_count,
            execute_count,
            status: StatusObservation::new(
                SuitePhase::Planning,
                "Generating test case candidates",
            ),
            report: None,
        }
    }
}
