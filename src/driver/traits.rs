use crate::error::StepError;
use crate::model::TestSpecification;
use async_trait::async_trait;
use std::path::Path;

/// Result of performing one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Step completed
    Done,
    /// Step ran but the target did not behave as expected
    CheckFailed(String),
}

/// Step executor capability
///
/// Selected once at construction (browser or simulated). The executor does
/// not run anything itself: it acquires the shared execution resource for a
/// batch of runs, and the resource hands out isolated sessions.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Executor name used in logs (e.g. "browser", "simulated")
    fn name(&self) -> &str;

    /// Acquire the shared resource for one batch (e.g. launch a browser)
    async fn launch(&self) -> Result<Box<dyn ExecutionResource>, StepError>;
}

/// Shared execution resource, acquired and released once per batch
#[async_trait]
pub trait ExecutionResource: Send + Sync {
    /// Carve out an isolated sub-resource for a single run
    async fn open_session(
        &self,
        spec: &TestSpecification,
    ) -> Result<Box<dyn Session>, StepError>;

    /// Release the shared resource
    async fn shutdown(&self) -> Result<(), StepError>;
}

/// Isolated per-run session (e.g. a browser context with one page)
///
/// Nothing in a session is shared with other runs.
#[async_trait]
pub trait Session: Send {
    /// Open the target endpoint
    async fn navigate(&mut self, target: &str) -> Result<(), StepError>;

    /// Perform one free-form step
    ///
    /// # Arguments
    /// * `index` - 0-based step position
    /// * `step` - the step description
    async fn perform(&mut self, index: usize, step: &str) -> Result<StepOutcome, StepError>;

    /// Final check of the test's validation criteria once all steps ran.
    ///
    /// # Returns
    /// The criteria that were not met; empty when the run passed.
    async fn verify(&mut self, _spec: &TestSpecification) -> Result<Vec<String>, StepError> {
        Ok(Vec::new())
    }

    /// Write a screenshot (or equivalent artifact) to `path`
    async fn capture(&mut self, path: &Path) -> Result<(), StepError>;

    /// Release the session; called exactly once on every exit path
    async fn close(&mut self) -> Result<(), StepError>;
}
