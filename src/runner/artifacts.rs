use futures::FutureExt;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use super::context::RunContext;
use crate::driver::traits::Session;

/// Artifacts successfully recorded by one run, in capture order
pub struct ArtifactLog<'a> {
    ctx: &'a RunContext,
    spec_id: &'a str,
    paths: Vec<String>,
}

impl<'a> ArtifactLog<'a> {
    pub fn new(ctx: &'a RunContext, spec_id: &'a str) -> Self {
        Self {
            ctx,
            spec_id,
            paths: Vec::new(),
        }
    }

    /// Best-effort capture bounded by the action timeout. Failures are logged
    /// and never change the verdict.
    pub async fn capture(&mut self, session: &mut dyn Session, label: &str) {
        let path = self.ctx.artifact_path(self.spec_id, label);
        let attempt = AssertUnwindSafe(session.capture(&path)).catch_unwind();

        match tokio::time::timeout(self.ctx.action_timeout, attempt).await {
            Ok(Ok(Ok(()))) => self.paths.push(path.to_string_lossy().to_string()),
            Ok(Ok(Err(e))) => log::warn!("[{}] {} capture failed: {}", self.spec_id, label, e),
            Ok(Err(_)) => log::warn!("[{}] {} capture panicked", self.spec_id, label),
            Err(_) => log::warn!("[{}] {} capture timed out", self.spec_id, label),
        }
    }

    pub fn into_paths(self) -> Vec<String> {
        self.paths
    }
}

/// References recorded in a report plus any file under `dir` whose name
/// contains the task id. Deduplicated and sorted.
pub fn list_artifacts(dir: &Path, task_id: &str, recorded: &[String]) -> Vec<String> {
    let mut found: BTreeSet<String> = recorded.iter().cloned().collect();

    if dir.is_dir() {
        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().contains(task_id))
        {
            found.insert(entry.path().to_string_lossy().to_string());
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_artifacts_filters_by_task() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("suite_a_test_001_start.png"), b"x").unwrap();
        std::fs::write(dir.path().join("suite_b_test_001_start.png"), b"x").unwrap();

        let listed = list_artifacts(dir.path(), "suite_a", &[]);
        assert_eq!(listed.len(), 1);
        assert!(listed[0].ends_with("suite_a_test_001_start.png"));
    }

    #[test]
    fn test_list_artifacts_merges_recorded_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join("suite_a_test_001_end.png");
        std::fs::write(&on_disk, b"x").unwrap();

        let recorded = vec![
            on_disk.to_string_lossy().to_string(),
            "elsewhere/suite_a_test_002_end.png".to_string(),
        ];
        let listed = list_artifacts(dir.path(), "suite_a", &recorded);
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn test_list_artifacts_missing_dir() {
        let listed = list_artifacts(Path::new("/nonexistent/lumi"), "suite_a", &[]);
        assert!(listed.is_empty());
    }
}
