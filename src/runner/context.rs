use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runtime information shared by every run of one suite
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Suite run the artifacts belong to
    pub task_id: String,

    /// Directory screenshots are written to
    pub artifacts_dir: PathBuf,

    /// Bound for a single session action (navigate, step, verify, capture)
    pub action_timeout: Duration,

    /// Bound for one whole test run
    pub run_timeout: Duration,

    /// Runs not yet admitted when this fires are reported as cancelled
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(task_id: &str, artifacts_dir: &Path) -> Self {
        Self {
            task_id: task_id.to_string(),
            artifacts_dir: artifacts_dir.to_path_buf(),
            action_timeout: Duration::from_millis(5_000),
            run_timeout: Duration::from_millis(300_000),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeouts(mut self, action: Duration, run: Duration) -> Self {
        self.action_timeout = action;
        self.run_timeout = run;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// `{task_id}_{spec_id}_{label}.png` inside the artifacts directory
    pub fn artifact_path(&self, spec_id: &str, label: &str) -> PathBuf {
        let name = format!(
            "{}_{}_{}.png",
            sanitize(&self.task_id),
            sanitize(spec_id),
            label
        );
        self.artifacts_dir.join(name)
    }
}

/// Ensure valid file name
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' => '_',
            c => c,
        })
        .collect()
}
