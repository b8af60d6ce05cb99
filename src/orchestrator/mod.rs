//! Suite orchestration
//!
//! A suite run walks `Planning → Ranking → Executing → Reporting →
//! Completed`, or ends in `Failed` when a suite-level fault escapes. Every
//! transition overwrites the run's status in the [`TaskStore`] and is
//! broadcast as a [`SuiteEvent::PhaseChanged`].

pub mod store;

pub use store::TaskStore;

use chrono::Utc;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::driver::{build_executor, traits::StepExecutor};
use crate::error::{panic_message, LlmError, SuiteError};
use crate::llm::{ChatModel, OpenAiChat};
use crate::planner::{CaseGenerator, LlmCaseGenerator};
use crate::ranker::{LlmRanker, Ranker};
use crate::report::TestReport;
use crate::runner::artifacts::list_artifacts;
use crate::runner::{
    EventEmitter, ExecutionCoordinator, RunContext, StatusObservation, SuiteEvent, SuitePhase,
    SuiteRun, TestRunner,
};
use crate::utils::config::Config;

/// Parameters of one suite run
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteRequest {
    pub target: String,
    pub candidate_count: usize,
    pub execute_count: usize,
}

impl SuiteRequest {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            candidate_count: 8,
            execute_count: 4,
        }
    }

    pub fn with_counts(mut self, candidate_count: usize, execute_count: usize) -> Self {
        self.candidate_count = candidate_count;
        self.execute_count = execute_count;
        self
    }

    pub fn validate(&self) -> Result<(), SuiteError> {
        if self.target.trim().is_empty() {
            return Err(SuiteError::InvalidRequest("target is empty".to_string()));
        }
        if self.candidate_count == 0 {
            return Err(SuiteError::InvalidRequest(
                "candidate_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `suite_{utc timestamp}_{8 hex}`
pub fn new_task_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("suite_{}_{}", Utc::now().format("%Y%m%dT%H%M%S"), &suffix[..8])
}

/// A suite run executing in the background
pub struct SuiteHandle {
    task_id: String,
    cancel: CancellationToken,
    join: JoinHandle<Result<TestReport, SuiteError>>,
}

impl SuiteHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Stop admitting further runs of this suite
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token for cancelling this suite from elsewhere (a signal handler)
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to reach a terminal phase
    pub async fn wait(self) -> Result<TestReport, SuiteError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(SuiteError::Panicked(panic_message(&*e.into_panic()))),
            Err(e) => Err(SuiteError::Panicked(e.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct RunSettings {
    artifacts_dir: PathBuf,
    action_timeout: Duration,
    run_timeout: Duration,
}

/// Drives suite runs through their phases. Cheap to clone; clones share the
/// task store, event channel and the tokens of active suites.
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn CaseGenerator>,
    ranker: Arc<dyn Ranker>,
    coordinator: Arc<ExecutionCoordinator>,
    store: TaskStore,
    emitter: EventEmitter,
    settings: RunSettings,
    /// One token per suite still running, removed when the suite ends
    active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn CaseGenerator>,
        ranker: Arc<dyn Ranker>,
        executor: Arc<dyn StepExecutor>,
        config: &Config,
    ) -> Self {
        let emitter = EventEmitter::default();
        let coordinator = ExecutionCoordinator::new(
            executor,
            TestRunner::new(emitter.clone()),
            config.max_concurrency,
        );

        Self {
            generator,
            ranker,
            coordinator: Arc::new(coordinator),
            store: TaskStore::new(config.status_retention()),
            emitter,
            settings: RunSettings {
                artifacts_dir: config.artifacts_dir.clone(),
                action_timeout: config.action_timeout(),
                run_timeout: config.run_timeout(),
            },
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Model-backed generator and ranker plus the configured executor
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let model: Option<Arc<dyn ChatModel>> = match OpenAiChat::from_config(&config.llm)? {
            Some(chat) => Some(Arc::new(chat)),
            None => {
                log::warn!("No API key configured; using fallback test catalog and priority ranking");
                None
            }
        };

        Ok(Self::new(
            Arc::new(LlmCaseGenerator::new(
                model.clone(),
                config.llm.planner_temperature,
            )),
            Arc::new(LlmRanker::new(model, config.llm.ranker_temperature)),
            build_executor(config),
            config,
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SuiteEvent> {
        self.emitter.subscribe()
    }

    /// Stop admission of further runs in every suite active right now.
    /// Suites started afterwards are unaffected.
    pub fn cancel_active(&self) -> usize {
        let active = self.active.lock();
        for token in active.values() {
            token.cancel();
        }
        active.len()
    }

    /// Validate, register and launch a suite run in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, request: SuiteRequest) -> Result<SuiteHandle, SuiteError> {
        request.validate()?;
        let task_id = new_task_id();
        let cancel = self.register(&task_id, &request)?;

        let this = self.clone();
        let id = task_id.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move { this.contained(&id, &request, token).await });

        Ok(SuiteHandle {
            task_id,
            cancel,
            join,
        })
    }

    /// Same pipeline as [`Orchestrator::start`], in the foreground
    pub async fn run_suite(
        &self,
        task_id: &str,
        request: &SuiteRequest,
    ) -> Result<TestReport, SuiteError> {
        request.validate()?;
        let cancel = self.register(task_id, request)?;
        self.contained(task_id, request, cancel).await
    }

    pub fn status(&self, task_id: &str) -> Option<StatusObservation> {
        self.store.status(task_id)
    }

    pub fn report(&self, task_id: &str) -> Option<TestReport> {
        self.store.report(task_id)
    }

    pub fn artifacts(&self, task_id: &str) -> Vec<String> {
        let recorded = self
            .store
            .report(task_id)
            .map(|r| r.artifacts)
            .unwrap_or_default();
        list_artifacts(&self.settings.artifacts_dir, task_id, &recorded)
    }

    fn register(
        &self,
        task_id: &str,
        request: &SuiteRequest,
    ) -> Result<CancellationToken, SuiteError> {
        let run = SuiteRun::new(
            task_id,
            &request.target,
            request.candidate_count,
            request.execute_count,
        );
        let status = run.status.clone();
        if !self.store.register(run) {
            return Err(SuiteError::InvalidRequest(format!(
                "task id {} already in use",
                task_id
            )));
        }

        let cancel = CancellationToken::new();
        self.active.lock().insert(task_id.to_string(), cancel.clone());

        log::info!("[{}] suite registered for {}", task_id, request.target);
        self.emitter.emit(SuiteEvent::PhaseChanged {
            task_id: task_id.to_string(),
            status,
        });
        Ok(cancel)
    }

    fn publish(&self, task_id: &str, phase: SuitePhase, message: &str) -> Result<(), SuiteError> {
        let status = self.store.advance(task_id, phase, message)?;
        log::info!("[{}] {}: {}", task_id, phase, message);
        self.emitter.emit(SuiteEvent::PhaseChanged {
            task_id: task_id.to_string(),
            status,
        });
        Ok(())
    }

    /// Pipeline with every escaping fault (error or panic) mapped to `Failed`
    async fn contained(
        &self,
        task_id: &str,
        request: &SuiteRequest,
        cancel: CancellationToken,
    ) -> Result<TestReport, SuiteError> {
        let outcome = AssertUnwindSafe(self.pipeline(task_id, request, cancel))
            .catch_unwind()
            .await;
        self.active.lock().remove(task_id);

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => Err(SuiteError::Panicked(panic_message(&*panic))),
        };

        if let Err(e) = &result {
            log::error!("[{}] suite failed: {}", task_id, e);
            if let Err(publish_err) = self.publish(task_id, SuitePhase::Failed, &e.to_string()) {
                log::warn!("[{}] could not record failure: {}", task_id, publish_err);
            }
        }
        result
    }

    async fn pipeline(
        &self,
        task_id: &str,
        request: &SuiteRequest,
        cancel: CancellationToken,
    ) -> Result<TestReport, SuiteError> {
        let candidates = self
            .generator
            .generate(&request.target, request.candidate_count)
            .await;
        let total_candidates = candidates.len();
        self.emitter.emit(SuiteEvent::CandidatesGenerated {
            task_id: task_id.to_string(),
            count: total_candidates,
        });

        self.publish(
            task_id,
            SuitePhase::Ranking,
            &format!("Ranking {} candidates", total_candidates),
        )?;
        let mut selected = self.ranker.rank(candidates).await;
        selected.truncate(request.execute_count);
        self.emitter.emit(SuiteEvent::TestsSelected {
            task_id: task_id.to_string(),
            count: selected.len(),
        });

        self.publish(
            task_id,
            SuitePhase::Executing,
            &format!(
                "Executing {} tests ({} concurrent)",
                selected.len(),
                self.coordinator.max_concurrency()
            ),
        )?;
        let ctx = RunContext::new(task_id, &self.settings.artifacts_dir)
            .with_timeouts(self.settings.action_timeout, self.settings.run_timeout)
            .with_cancel(cancel);
        let results = self
            .coordinator
            .execute_all(&selected, &request.target, &ctx)
            .await;
        if results.len() != selected.len() {
            return Err(SuiteError::ResultCountMismatch {
                expected: selected.len(),
                got: results.len(),
            });
        }

        self.publish(task_id, SuitePhase::Reporting, "Assembling report")?;
        let report = TestReport::assemble(
            task_id,
            &request.target,
            total_candidates,
            results,
            Utc::now(),
        );
        let passed = report
            .execution_results
            .iter()
            .filter(|r| r.is_pass())
            .count();

        let status = self.store.complete(
            task_id,
            report.clone(),
            &format!("{} of {} tests passed", passed, report.executed_tests),
        )?;
        log::info!("[{}] completed: {}", task_id, status.message);
        self.emitter.emit(SuiteEvent::PhaseChanged {
            task_id: task_id.to_string(),
            status,
        });

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::stub::{StubBehavior, StubExecutor};
    use crate::model::{TestSpecification, Verdict};
    use crate::ranker::PriorityRanker;
    use async_trait::async_trait;

    struct PanickingGenerator;

    #[async_trait]
    impl CaseGenerator for PanickingGenerator {
        async fn generate(&self, _target: &str, _count: usize) -> Vec<TestSpecification> {
            panic!("planner exploded");
        }
    }

    fn config(dir: &std::path::Path) -> Config {
        Config {
            artifacts_dir: dir.to_path_buf(),
            max_concurrency: 2,
            ..Default::default()
        }
    }

    fn orchestrator(executor: &StubExecutor, dir: &std::path::Path) -> Orchestrator {
        Orchestrator::new(
            Arc::new(LlmCaseGenerator::new(None, 0.7)),
            Arc::new(PriorityRanker),
            Arc::new(executor.clone()),
            &config(dir),
        )
    }

    fn phases(rx: &mut broadcast::Receiver<SuiteEvent>) -> Vec<SuitePhase> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SuiteEvent::PhaseChanged { status, .. } = event {
                seen.push(status.phase);
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_successful_run_phase_log() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&StubExecutor::new(), dir.path());
        let mut rx = orch.subscribe();

        let report = orch
            .run_suite("suite_ok", &SuiteRequest::new("https://app.test").with_counts(4, 2))
            .await
            .unwrap();

        assert_eq!(
            phases(&mut rx),
            vec![
                SuitePhase::Planning,
                SuitePhase::Ranking,
                SuitePhase::Executing,
                SuitePhase::Reporting,
                SuitePhase::Completed,
            ]
        );
        assert_eq!(report.total_candidates, 4);
        assert_eq!(report.executed_tests, 2);
        assert_eq!(report.success_rate, 1.0);
        assert_eq!(orch.status("suite_ok").unwrap().phase, SuitePhase::Completed);
        assert_eq!(orch.report("suite_ok"), Some(report));
    }

    #[tokio::test]
    async fn test_execute_count_zero_gives_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let executor = StubExecutor::new();
        let orch = orchestrator(&executor, dir.path());

        let report = orch
            .run_suite("suite_zero", &SuiteRequest::new("https://app.test").with_counts(3, 0))
            .await
            .unwrap();

        assert_eq!(report.executed_tests, 0);
        assert_eq!(report.success_rate, 0.0);
        assert!(report.artifacts.is_empty());
        assert_eq!(executor.counters.launches(), 0);
    }

    #[tokio::test]
    async fn test_execute_count_larger_than_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&StubExecutor::new(), dir.path());

        let report = orch
            .run_suite("suite_big", &SuiteRequest::new("https://app.test").with_counts(3, 10))
            .await
            .unwrap();

        assert_eq!(report.total_candidates, 3);
        assert_eq!(report.executed_tests, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fault_in_one_spec_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        // Second step of "Primary Interaction Test" faults
        let executor = StubExecutor::new().with_behavior(
            "fallback_002",
            StubBehavior {
                fail_at_step: Some(1),
                ..Default::default()
            },
        );
        let orch = orchestrator(&executor, dir.path());

        let report = orch
            .run_suite("suite_iso", &SuiteRequest::new("https://app.test").with_counts(5, 5))
            .await
            .unwrap();

        assert_eq!(report.executed_tests, 5);
        for result in &report.execution_results {
            if result.test_case_id == "fallback_002" {
                assert_eq!(result.verdict, Verdict::Error);
            } else {
                assert_eq!(result.verdict, Verdict::Pass);
            }
        }
        assert!((report.success_rate - 0.8).abs() < 1e-9);
        assert_eq!(orch.status("suite_iso").unwrap().phase, SuitePhase::Completed);
    }

    #[tokio::test]
    async fn test_results_follow_ranked_order() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&StubExecutor::new(), dir.path());

        let report = orch
            .run_suite("suite_ord", &SuiteRequest::new("https://app.test").with_counts(5, 5))
            .await
            .unwrap();

        // High, High, Medium, Medium, Low in the catalog; stable sort keeps it
        let ids: Vec<_> = report
            .execution_results
            .iter()
            .map(|r| r.test_case_id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["fallback_001", "fallback_002", "fallback_003", "fallback_004", "fallback_005"]
        );
    }

    #[tokio::test]
    async fn test_panic_in_pipeline_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(
            Arc::new(PanickingGenerator),
            Arc::new(PriorityRanker),
            Arc::new(StubExecutor::new()),
            &config(dir.path()),
        );
        let mut rx = orch.subscribe();

        let err = orch
            .run_suite("suite_boom", &SuiteRequest::new("https://app.test"))
            .await
            .unwrap_err();

        assert!(matches!(err, SuiteError::Panicked(_)));
        assert_eq!(phases(&mut rx), vec![SuitePhase::Planning, SuitePhase::Failed]);
        let status = orch.status("suite_boom").unwrap();
        assert_eq!(status.phase, SuitePhase::Failed);
        assert!(status.message.contains("planner exploded"));
        assert!(orch.report("suite_boom").is_none());
    }

    #[tokio::test]
    async fn test_start_runs_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&StubExecutor::new(), dir.path());

        let handle = orch
            .start(SuiteRequest::new("https://app.test").with_counts(2, 2))
            .unwrap();
        let task_id = handle.task_id().to_string();
        assert!(task_id.starts_with("suite_"));
        assert!(orch.status(&task_id).is_some());

        let report = handle.wait().await.unwrap();
        assert_eq!(report.task_id, task_id);
        assert_eq!(orch.status(&task_id).unwrap().phase, SuitePhase::Completed);

        // start, 3 or 5 steps, end: every recorded artifact is listed
        let listed = orch.artifacts(&task_id);
        assert!(!listed.is_empty());
        assert!(report.artifacts.iter().all(|a| listed.contains(a)));
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&StubExecutor::new(), dir.path());

        assert!(matches!(
            orch.start(SuiteRequest::new("  ")),
            Err(SuiteError::InvalidRequest(_))
        ));
        assert!(matches!(
            orch.start(SuiteRequest::new("https://app.test").with_counts(0, 1)),
            Err(SuiteError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_task_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&StubExecutor::new(), dir.path());
        let request = SuiteRequest::new("https://app.test").with_counts(1, 1);

        orch.run_suite("suite_dup", &request).await.unwrap();
        let err = orch.run_suite("suite_dup", &request).await.unwrap_err();
        assert!(matches!(err, SuiteError::InvalidRequest(_)));
        assert_eq!(orch.status("suite_dup").unwrap().phase, SuitePhase::Completed);
    }

    #[tokio::test]
    async fn test_cancel_does_not_leak_into_later_suites() {
        let dir = tempfile::tempdir().unwrap();
        let executor = StubExecutor::new().with_delay(Duration::from_millis(200));
        let orch = orchestrator(&executor, dir.path());

        let first = orch
            .start(SuiteRequest::new("https://app.test").with_counts(4, 4))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(orch.cancel_active(), 1);
        let cancelled = first.wait().await.unwrap();
        assert!(cancelled
            .execution_results
            .iter()
            .any(|r| r.error_message.as_deref() == Some("Cancelled before admission")));

        assert_eq!(orch.cancel_active(), 0);
        let later = orch
            .run_suite("suite_later", &SuiteRequest::new("https://app.test").with_counts(3, 3))
            .await
            .unwrap();
        assert_eq!(later.executed_tests, 3);
        assert!(later.execution_results.iter().all(|r| r.is_pass()));
    }

    #[tokio::test]
    async fn test_handle_cancels_only_its_suite() {
        let dir = tempfile::tempdir().unwrap();
        let executor = StubExecutor::new().with_delay(Duration::from_millis(150));
        let orch = orchestrator(&executor, dir.path());

        let doomed = orch
            .start(SuiteRequest::new("https://app.test").with_counts(4, 4))
            .unwrap();
        let kept = orch
            .start(SuiteRequest::new("https://app.test").with_counts(2, 2))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        doomed.cancel();

        let doomed = doomed.wait().await.unwrap();
        let kept = kept.wait().await.unwrap();
        assert!(doomed.execution_results.iter().any(|r| !r.is_pass()));
        assert!(kept.execution_results.iter().all(|r| r.is_pass()));
    }

    #[test]
    fn test_task_id_shape() {
        let id = new_task_id();
        let parts: Vec<_> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "suite");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_task_id(), new_task_id());
    }
}
