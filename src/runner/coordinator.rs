//! Bounded-concurrency execution of a batch of test specifications
//!
//! One shared execution resource is launched per batch. Each specification
//! runs in its own task once it gets through the admission gate, so at most
//! `max_concurrency` sessions are ever open at the same time. Results come
//! back in input order whatever the completion order was.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::context::RunContext;
use super::test_runner::TestRunner;
use crate::driver::traits::{ExecutionResource, StepExecutor};
use crate::error::{panic_message, StepError};
use crate::model::{ExecutionResult, TestSpecification};

pub struct ExecutionCoordinator {
    executor: Arc<dyn StepExecutor>,
    runner: Arc<TestRunner>,
    max_concurrency: usize,
}

impl ExecutionCoordinator {
    /// `max_concurrency` below 1 is raised to 1
    pub fn new(executor: Arc<dyn StepExecutor>, runner: TestRunner, max_concurrency: usize) -> Self {
        Self {
            executor,
            runner: Arc::new(runner),
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Execute every specification and return exactly one result per input,
    /// position `i` belonging to `specs[i]`.
    pub async fn execute_all(
        &self,
        specs: &[TestSpecification],
        target: &str,
        ctx: &RunContext,
    ) -> Vec<ExecutionResult> {
        if specs.is_empty() {
            return Vec::new();
        }

        let resource: Arc<dyn ExecutionResource> = match self.executor.launch().await {
            Ok(resource) => Arc::from(resource),
            Err(e) => {
                log::error!("{} executor failed to launch: {}", self.executor.name(), e);
                let now = Utc::now();
                return specs
                    .iter()
                    .map(|spec| ExecutionResult::errored(&spec.id, now, 0, e.to_string(), Vec::new()))
                    .collect();
            }
        };

        log::info!(
            "Executing {} tests with {} (max {} concurrent)",
            specs.len(),
            self.executor.name(),
            self.max_concurrency
        );

        let gate = Arc::new(Semaphore::new(self.max_concurrency));
        let target: Arc<str> = Arc::from(target);
        let ctx = Arc::new(ctx.clone());

        let handles: Vec<_> = specs
            .iter()
            .cloned()
            .map(|spec| {
                let gate = gate.clone();
                let target = target.clone();
                let ctx = ctx.clone();
                let resource = resource.clone();
                let runner = self.runner.clone();

                tokio::spawn(async move {
                    let permit = tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => None,
                        permit = gate.acquire_owned() => permit.ok(),
                    };
                    let Some(_permit) = permit else {
                        log::info!("[{}] cancelled before admission", spec.id);
                        return ExecutionResult::errored(
                            &spec.id,
                            Utc::now(),
                            0,
                            StepError::Cancelled.to_string(),
                            Vec::new(),
                        );
                    };
                    runner.run(&spec, &target, &ctx, resource.as_ref()).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(specs.len());
        for (spec, handle) in specs.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        panic_message(&*join_error.into_panic())
                    } else {
                        join_error.to_string()
                    };
                    log::error!("[{}] run task aborted: {}", spec.id, message);
                    ExecutionResult::errored(
                        &spec.id,
                        Utc::now(),
                        0,
                        StepError::Panicked(message).to_string(),
                        Vec::new(),
                    )
                }
            };
            results.push(result);
        }

        if let Err(e) = resource.shutdown().await {
            log::warn!("Failed to release {} resource: {}", self.executor.name(), e);
        }

        results
    }
}
