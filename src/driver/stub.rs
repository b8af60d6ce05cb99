//! Instrumented step executor for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::traits::{ExecutionResource, Session, StepExecutor, StepOutcome};
use crate::error::StepError;
use crate::model::TestSpecification;

/// Scripted behaviour for one specification
#[derive(Debug, Clone, Default)]
pub struct StubBehavior {
    pub step_delay: Option<Duration>,
    /// 0-based step that returns an error
    pub fail_at_step: Option<usize>,
    /// 0-based step whose check fails
    pub check_fail_at_step: Option<usize>,
    /// 0-based step that panics
    pub panic_at_step: Option<usize>,
    pub fail_open: bool,
    pub fail_capture: bool,
    pub fail_navigation: bool,
    pub unmet_criteria: Vec<String>,
}

#[derive(Default)]
pub struct StubCounters {
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub captures: Mutex<Vec<PathBuf>>,
}

impl StubCounters {
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn captured_labels(&self, spec_id: &str) -> Vec<String> {
        self.captures
            .lock()
            .iter()
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .filter_map(|name| {
                let marker = format!("_{}_", spec_id);
                name.find(&marker)
                    .map(|pos| name[pos + marker.len()..].to_string())
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct StubExecutor {
    pub default_delay: Duration,
    pub behaviors: HashMap<String, StubBehavior>,
    pub fail_launch: bool,
    pub counters: Arc<StubCounters>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self {
            default_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    pub fn with_behavior(mut self, spec_id: &str, behavior: StubBehavior) -> Self {
        self.behaviors.insert(spec_id.to_string(), behavior);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }
}

#[async_trait]
impl StepExecutor for StubExecutor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn launch(&self) -> Result<Box<dyn ExecutionResource>, StepError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(StepError::Launch("stub launch refused".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ExecutionResource for StubExecutor {
    async fn open_session(
        &self,
        spec: &TestSpecification,
    ) -> Result<Box<dyn Session>, StepError> {
        let behavior = self.behaviors.get(&spec.id).cloned().unwrap_or_default();
        if behavior.fail_open {
            return Err(StepError::Session(format!("no context for {}", spec.id)));
        }

        let now = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(now, Ordering::SeqCst);
        self.counters.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(StubSession {
            delay: behavior.step_delay.unwrap_or(self.default_delay),
            behavior,
            counters: self.counters.clone(),
            closed: false,
        }))
    }

    async fn shutdown(&self) -> Result<(), StepError> {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubSession {
    delay: Duration,
    behavior: StubBehavior,
    counters: Arc<StubCounters>,
    closed: bool,
}

#[async_trait]
impl Session for StubSession {
    async fn navigate(&mut self, target: &str) -> Result<(), StepError> {
        if self.behavior.fail_navigation {
            return Err(StepError::Navigation(format!("{} unreachable", target)));
        }
        Ok(())
    }

    async fn perform(&mut self, index: usize, step: &str) -> Result<StepOutcome, StepError> {
        tokio::time::sleep(self.delay).await;
        if self.behavior.panic_at_step == Some(index) {
            panic!("stub panic at step {}", index + 1);
        }
        if self.behavior.fail_at_step == Some(index) {
            return Err(StepError::Action {
                index: index + 1,
                message: format!("stub fault in '{}'", step),
            });
        }
        if self.behavior.check_fail_at_step == Some(index) {
            return Ok(StepOutcome::CheckFailed(step.to_string()));
        }
        Ok(StepOutcome::Done)
    }

    async fn verify(&mut self, _spec: &TestSpecification) -> Result<Vec<String>, StepError> {
        Ok(self.behavior.unmet_criteria.clone())
    }

    async fn capture(&mut self, path: &Path) -> Result<(), StepError> {
        if self.behavior.fail_capture {
            return Err(StepError::Capture("stub camera broken".to_string()));
        }
        self.counters.captures.lock().push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StepError> {
        if !self.closed {
            self.closed = true;
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
