pub mod action;
pub mod simulated;
pub mod traits;
pub mod web;

#[cfg(test)]
pub(crate) mod stub;

use std::sync::Arc;

use crate::utils::config::{Config, ExecutorKind};
use traits::StepExecutor;

/// Build the step executor selected by configuration
pub fn build_executor(config: &Config) -> Arc<dyn StepExecutor> {
    match config.executor {
        ExecutorKind::Simulated => Arc::new(simulated::SimulatedExecutor::new(
            config.simulation.clone(),
        )),
        ExecutorKind::Browser => Arc::new(web::BrowserExecutor::new(
            config.browser.clone(),
            config.action_timeout_ms,
        )),
    }
}
