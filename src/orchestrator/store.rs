use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SuiteError;
use crate::report::TestReport;
use crate::runner::state::{StatusObservation, SuitePhase, SuiteRun};

/// In-memory registry of suite runs, shared by handle
#[derive(Clone, Default)]
pub struct TaskStore {
    runs: Arc<RwLock<HashMap<String, SuiteRun>>>,
    /// Terminal runs older than this no longer report a status
    retention: Option<Duration>,
}

impl TaskStore {
    pub fn new(retention: Option<Duration>) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Returns false when the task id is already registered
    pub fn register(&self, run: SuiteRun) -> bool {
        let mut runs = self.runs.write();
        if runs.contains_key(&run.task_id) {
            return false;
        }
        runs.insert(run.task_id.clone(), run);
        true
    }

    /// Move a run to `phase`, overwriting its status observation
    pub fn advance(
        &self,
        task_id: &str,
        phase: SuitePhase,
        message: &str,
    ) -> Result<StatusObservation, SuiteError> {
        let mut runs = self.runs.write();
        let run = runs
            .get_mut(task_id)
            .ok_or_else(|| SuiteError::UnknownTask(task_id.to_string()))?;

        if !run.status.phase.can_advance_to(phase) {
            return Err(SuiteError::InvalidTransition {
                from: run.status.phase.to_string(),
                to: phase.to_string(),
            });
        }

        run.status = StatusObservation::new(phase, message);
        Ok(run.status.clone())
    }

    /// Store the report and complete the run in one step
    pub fn complete(
        &self,
        task_id: &str,
        report: TestReport,
        message: &str,
    ) -> Result<StatusObservation, SuiteError> {
        let mut runs = self.runs.write();
        let run = runs
            .get_mut(task_id)
            .ok_or_else(|| SuiteError::UnknownTask(task_id.to_string()))?;

        if !run.status.phase.can_advance_to(SuitePhase::Completed) {
            return Err(SuiteError::InvalidTransition {
                from: run.status.phase.to_string(),
                to: SuitePhase::Completed.to_string(),
            });
        }

        run.report = Some(report);
        run.status = StatusObservation::new(SuitePhase::Completed, message);
        Ok(run.status.clone())
    }

    pub fn status(&self, task_id: &str) -> Option<StatusObservation> {
        let runs = self.runs.read();
        let status = &runs.get(task_id)?.status;
        if self.is_expired(status) {
            return None;
        }
        Some(status.clone())
    }

    pub fn report(&self, task_id: &str) -> Option<TestReport> {
        self.runs.read().get(task_id)?.report.clone()
    }

    fn is_expired(&self, status: &StatusObservation) -> bool {
        let Some(retention) = self.retention else {
            return false;
        };
        if !status.phase.is_terminal() {
            return false;
        }
        (chrono::Utc::now() - status.updated_at)
            .to_std()
            .map(|age| age > retention)
            .unwrap_or(false)
    }
}
