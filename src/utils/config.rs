use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which step executor variant to construct
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Simulated,
    Browser,
}

impl ExecutorKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "simulated" | "simulation" | "sim" => Some(ExecutorKind::Simulated),
            "browser" | "web" | "playwright" => Some(ExecutorKind::Browser),
            _ => None,
        }
    }
}

/// Web browser type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

/// Browser executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserConfig {
    pub headless: bool,
    pub browser_type: BrowserType,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Pause after navigation so client-side rendering settles (ms)
    pub settle_ms: u64,
    /// Explicit browser binary; discovered on PATH when unset
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            browser_type: BrowserType::Chromium,
            viewport_width: 1280,
            viewport_height: 720,
            settle_ms: 2000,
            executable: None,
        }
    }
}

/// Simulated executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub start_delay_ms: u64,
    pub step_delay_ms: u64,
    /// Probability in 0..=1 that a run misses its validation criteria
    pub failure_rate: f64,
    /// Fixed seed for reproducible verdicts
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: 2000,
            step_delay_ms: 500,
            failure_rate: 0.05,
            seed: None,
        }
    }
}

/// Language model endpoint used by the planner and ranker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub planner_temperature: f32,
    pub ranker_temperature: f32,
    pub request_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            planner_temperature: 0.7,
            ranker_temperature: 0.3,
            request_timeout_ms: 60_000,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Admission gate size for concurrent runs
    pub max_concurrency: usize,

    /// Timeout for a single driver action (ms)
    pub action_timeout_ms: u64,

    /// Timeout for a whole test run (ms)
    pub run_timeout_ms: u64,

    /// Directory where screenshots are written
    pub artifacts_dir: PathBuf,

    /// How long finished runs stay queryable; forever when unset
    pub status_retention_secs: Option<u64>,

    pub default_candidate_count: usize,
    pub default_execute_count: usize,

    pub executor: ExecutorKind,
    pub browser: BrowserConfig,
    pub simulation: SimulationConfig,
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            action_timeout_ms: 5000,
            run_timeout_ms: 300_000,
            artifacts_dir: PathBuf::from("artifacts/screenshots"),
            status_retention_secs: None,
            default_candidate_count: 8,
            default_execute_count: 4,
            executor: ExecutorKind::Simulated,
            browser: BrowserConfig::default(),
            simulation: SimulationConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Config {
    /// Load from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_yaml(&std::fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `OPENAI_API_KEY` / `LUMI_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("LUMI_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("LUMI_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(raw) = lookup("LUMI_MAX_CONCURRENCY") {
            self.max_concurrency = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("LUMI_MAX_CONCURRENCY is not a number: {}", raw))
            })?;
        }
        if let Some(raw) = lookup("LUMI_HEADLESS") {
            self.browser.headless = raw == "true" || raw == "1";
        }
        if let Some(raw) = lookup("LUMI_EXECUTOR") {
            self.executor = ExecutorKind::parse(&raw)
                .ok_or_else(|| ConfigError::Invalid(format!("Unknown executor: {}", raw)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "maxConcurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.simulation.failure_rate) {
            return Err(ConfigError::Invalid(format!(
                "simulation.failureRate must be within 0..=1, got {}",
                self.simulation.failure_rate
            )));
        }
        Ok(())
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn status_retention(&self) -> Option<Duration> {
        self.status_retention_secs.map(Duration::from_secs)
    }
}
