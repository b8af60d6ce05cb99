//! Error types shared across the suite engine

use thiserror::Error;

/// Faults raised by a step executor, its shared resource or an isolated session
#[derive(Error, Debug, Clone)]
pub enum StepError {
    #[error("Failed to launch execution resource: {0}")]
    Launch(String),

    #[error("Failed to open isolated session: {0}")]
    Session(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Step {index} failed: {message}")]
    Action { index: usize, message: String },

    #[error("Artifact capture failed: {0}")]
    Capture(String),

    #[error("{what} timed out after {ms}ms")]
    Timeout { what: String, ms: u64 },

    #[error("Executor panicked: {0}")]
    Panicked(String),

    #[error("Cancelled before admission")]
    Cancelled,
}

/// Upstream language-model failures, absorbed by planner and ranker fallbacks
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("No API key configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Upstream reply had no content")]
    EmptyReply,

    #[error("Could not decode reply: {0}")]
    Unparsable(String),
}

/// Suite-level faults; the only errors that move a run to `Failed`
#[derive(Error, Debug, Clone)]
pub enum SuiteError {
    #[error("Invalid suite request: {0}")]
    InvalidRequest(String),

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Coordinator returned {got} results for {expected} specifications")]
    ResultCountMismatch { expected: usize, got: usize },

    #[error("Suite task panicked: {0}")]
    Panicked(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Render a caught panic payload as text
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
