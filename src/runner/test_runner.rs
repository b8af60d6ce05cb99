//! Executes one test specification against one isolated session

use chrono::Utc;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use super::artifacts::ArtifactLog;
use super::context::RunContext;
use super::events::{EventEmitter, SuiteEvent};
use crate::driver::traits::{ExecutionResource, Session, StepOutcome};
use crate::error::{panic_message, StepError};
use crate::model::{ExecutionResult, TestSpecification};

/// How the body of a run ended
enum RunOutcome {
    Passed,
    Failed(Vec<String>),
    Fault(StepError),
}

async fn bounded<T, F>(what: &str, limit: Duration, fut: F) -> Result<T, StepError>
where
    F: Future<Output = Result<T, StepError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StepError::Timeout {
            what: what.to_string(),
            ms: limit.as_millis() as u64,
        }),
    }
}

#[derive(Default)]
pub struct TestRunner {
    emitter: EventEmitter,
}

impl TestRunner {
    pub fn new(emitter: EventEmitter) -> Self {
        Self { emitter }
    }

    /// Run `spec` to completion. Never fails: every fault is folded into an
    /// `ERROR` result and the session is closed on every path.
    pub async fn run(
        &self,
        spec: &TestSpecification,
        target: &str,
        ctx: &RunContext,
        resource: &dyn ExecutionResource,
    ) -> ExecutionResult {
        let started_at = Utc::now();
        let clock = Instant::now();

        self.emitter.emit(SuiteEvent::RunStarted {
            task_id: ctx.task_id.clone(),
            test_case_id: spec.id.clone(),
            name: spec.name.clone(),
        });
        log::info!("[{}] running '{}' against {}", spec.id, spec.name, target);

        let opened = AssertUnwindSafe(bounded(
            "session open",
            ctx.action_timeout,
            resource.open_session(spec),
        ))
        .catch_unwind()
        .await;

        // No session means nothing to capture or close
        let opened = match opened {
            Ok(opened) => opened,
            Err(panic) => Err(StepError::Panicked(panic_message(&*panic))),
        };
        let mut session = match opened {
            Ok(session) => session,
            Err(e) => {
                log::warn!("[{}] session open failed: {}", spec.id, e);
                let result = ExecutionResult::errored(
                    &spec.id,
                    started_at,
                    clock.elapsed().as_millis() as u64,
                    e.to_string(),
                    Vec::new(),
                );
                self.finish(ctx, &result);
                return result;
            }
        };

        let mut artifacts = ArtifactLog::new(ctx, &spec.id);

        let body = AssertUnwindSafe(drive(spec, target, ctx, session.as_mut(), &mut artifacts))
            .catch_unwind();
        let outcome = match tokio::time::timeout(ctx.run_timeout, body).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => RunOutcome::Fault(StepError::Panicked(panic_message(&*panic))),
            Err(_) => RunOutcome::Fault(StepError::Timeout {
                what: "test run".to_string(),
                ms: ctx.run_timeout.as_millis() as u64,
            }),
        };

        // Terminal capture, then release the session whatever happened above
        let label = match outcome {
            RunOutcome::Fault(_) => "error",
            _ => "end",
        };
        artifacts.capture(session.as_mut(), label).await;
        close_session(&spec.id, session.as_mut(), ctx.action_timeout).await;

        let duration_ms = clock.elapsed().as_millis() as u64;
        let paths = artifacts.into_paths();
        let result = match outcome {
            RunOutcome::Passed => ExecutionResult::passed(&spec.id, started_at, duration_ms, paths),
            RunOutcome::Failed(unmet) => {
                ExecutionResult::failed(&spec.id, started_at, duration_ms, unmet, paths)
            }
            RunOutcome::Fault(e) => {
                log::warn!("[{}] run errored: {}", spec.id, e);
                ExecutionResult::errored(&spec.id, started_at, duration_ms, e.to_string(), paths)
            }
        };

        self.finish(ctx, &result);
        result
    }

    fn finish(&self, ctx: &RunContext, result: &ExecutionResult) {
        log::info!(
            "[{}] {} in {}ms",
            result.test_case_id,
            result.verdict,
            result.duration_ms
        );
        self.emitter.emit(SuiteEvent::RunFinished {
            task_id: ctx.task_id.clone(),
            test_case_id: result.test_case_id.clone(),
            verdict: result.verdict,
            duration_ms: result.duration_ms,
            error: result.error_message.clone(),
        });
    }
}

/// Navigate, perform every step, verify. Returns on the first fault.
async fn drive(
    spec: &TestSpecification,
    target: &str,
    ctx: &RunContext,
    session: &mut dyn Session,
    artifacts: &mut ArtifactLog<'_>,
) -> RunOutcome {
    let navigated = bounded("navigation", ctx.action_timeout, session.navigate(target)).await;
    artifacts.capture(session, "start").await;
    if let Err(e) = navigated {
        return RunOutcome::Fault(e);
    }

    let mut unmet = Vec::new();
    for (index, step) in spec.steps.iter().enumerate() {
        let what = format!("step {}", index + 1);
        match bounded(&what, ctx.action_timeout, session.perform(index, step)).await {
            Ok(StepOutcome::Done) => {}
            Ok(StepOutcome::CheckFailed(missed)) => unmet.push(missed),
            Err(e) => return RunOutcome::Fault(e),
        }
        artifacts
            .capture(session, &format!("step_{}", index + 1))
            .await;
    }

    match bounded("verification", ctx.action_timeout, session.verify(spec)).await {
        Ok(missed) => unmet.extend(missed),
        Err(e) => return RunOutcome::Fault(e),
    }

    if unmet.is_empty() {
        RunOutcome::Passed
    } else {
        RunOutcome::Failed(unmet)
    }
}

async fn close_session(spec_id: &str, session: &mut dyn Session, limit: Duration) {
    let closing = AssertUnwindSafe(bounded("session close", limit, session.close())).catch_unwind();
    match closing.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("[{}] session close failed: {}", spec_id, e),
        Err(_) => log::warn!("[{}] session close panicked", spec_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::stub::{StubBehavior, StubExecutor};
    use crate::driver::traits::StepExecutor;
    use crate::model::{Category, Priority, Verdict};
    use std::path::Path;

    fn spec(id: &str, steps: usize) -> TestSpecification {
        let steps: Vec<String> = (1..=steps).map(|i| format!("Click item {}", i)).collect();
        TestSpecification::new(id, "Stubbed", Category::Interaction, Priority::Medium)
            .with_steps(steps)
    }

    fn ctx() -> RunContext {
        RunContext::new("suite_t", Path::new("shots"))
            .with_timeouts(Duration::from_millis(200), Duration::from_secs(5))
    }

    async fn run_one(executor: &StubExecutor, spec: &TestSpecification) -> ExecutionResult {
        let resource = executor.launch().await.unwrap();
        TestRunner::default()
            .run(spec, "https://example.test", &ctx(), resource.as_ref())
            .await
    }

    #[tokio::test]
    async fn test_pass_records_artifacts_in_order() {
        let executor = StubExecutor::new();
        let result = run_one(&executor, &spec("t1", 2)).await;

        assert_eq!(result.verdict, Verdict::Pass);
        assert!(result.error_message.is_none());
        assert_eq!(
            executor.counters.captured_labels("t1"),
            vec!["start", "step_1", "step_2", "end"]
        );
        assert_eq!(result.artifacts.len(), 4);
        assert_eq!(executor.counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_step_fault_is_error_and_closes_session() {
        let executor = StubExecutor::new().with_behavior(
            "t1",
            StubBehavior {
                fail_at_step: Some(1),
                ..Default::default()
            },
        );
        let result = run_one(&executor, &spec("t1", 3)).await;

        assert_eq!(result.verdict, Verdict::Error);
        assert!(result.error_message.unwrap().contains("Step 2"));
        assert_eq!(
            executor.counters.captured_labels("t1"),
            vec!["start", "step_1", "error"]
        );
        assert_eq!(executor.counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_check_failure_and_unmet_criteria_are_fail() {
        let executor = StubExecutor::new().with_behavior(
            "t1",
            StubBehavior {
                check_fail_at_step: Some(0),
                unmet_criteria: vec!["Score visible".to_string()],
                ..Default::default()
            },
        );
        let result = run_one(&executor, &spec("t1", 2)).await;

        assert_eq!(result.verdict, Verdict::Fail);
        assert_eq!(result.unmet_criteria, vec!["Click item 1", "Score visible"]);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let executor = StubExecutor::new().with_behavior(
            "t1",
            StubBehavior {
                panic_at_step: Some(0),
                ..Default::default()
            },
        );
        let result = run_one(&executor, &spec("t1", 2)).await;

        assert_eq!(result.verdict, Verdict::Error);
        assert!(result.error_message.unwrap().contains("stub panic"));
        assert_eq!(executor.counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_action_timeout_is_error() {
        let executor = StubExecutor::new().with_behavior(
            "t1",
            StubBehavior {
                step_delay: Some(Duration::from_secs(2)),
                ..Default::default()
            },
        );
        let result = run_one(&executor, &spec("t1", 1)).await;

        assert_eq!(result.verdict, Verdict::Error);
        assert!(result.error_message.unwrap().contains("timed out"));
        assert_eq!(executor.counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_run_timeout_is_error() {
        let executor = StubExecutor::new().with_delay(Duration::from_millis(100));
        let resource = executor.launch().await.unwrap();
        let ctx = RunContext::new("suite_t", Path::new("shots"))
            .with_timeouts(Duration::from_secs(1), Duration::from_millis(250));

        let result = TestRunner::default()
            .run(&spec("t1", 10), "https://example.test", &ctx, resource.as_ref())
            .await;

        assert_eq!(result.verdict, Verdict::Error);
        assert!(result.error_message.unwrap().contains("test run"));
        assert_eq!(executor.counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_still_captures_start() {
        let executor = StubExecutor::new().with_behavior(
            "t1",
            StubBehavior {
                fail_navigation: true,
                ..Default::default()
            },
        );
        let result = run_one(&executor, &spec("t1", 2)).await;

        assert_eq!(result.verdict, Verdict::Error);
        assert_eq!(
            executor.counters.captured_labels("t1"),
            vec!["start", "error"]
        );
    }

    #[tokio::test]
    async fn test_capture_failure_does_not_change_verdict() {
        let executor = StubExecutor::new().with_behavior(
            "t1",
            StubBehavior {
                fail_capture: true,
                ..Default::default()
            },
        );
        let result = run_one(&executor, &spec("t1", 2)).await;

        assert_eq!(result.verdict, Verdict::Pass);
        assert!(result.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_is_error_without_artifacts() {
        let executor = StubExecutor::new().with_behavior(
            "t1",
            StubBehavior {
                fail_open: true,
                ..Default::default()
            },
        );
        let result = run_one(&executor, &spec("t1", 2)).await;

        assert_eq!(result.verdict, Verdict::Error);
        assert!(result.error_message.unwrap().contains("no context for t1"));
        assert!(result.artifacts.is_empty());
        assert!(executor.counters.captured_labels("t1").is_empty());
        assert_eq!(executor.counters.opened(), 0);
        assert_eq!(executor.counters.closed(), 0);
    }
}
