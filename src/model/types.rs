use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Test category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Interaction,
    Mechanics,
    Performance,
    ErrorHandling,
}

impl Category {
    /// Lenient parse accepting both `UI_INTERACTION` style and kebab-case names
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "interaction" | "ui-interaction" | "ui" => Some(Category::Interaction),
            "mechanics" | "game-mechanics" | "functional" => Some(Category::Mechanics),
            "performance" | "perf" => Some(Category::Performance),
            "error-handling" | "errors" | "error" => Some(Category::ErrorHandling),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Interaction => "interaction",
            Category::Mechanics => "mechanics",
            Category::Performance => "performance",
            Category::ErrorHandling => "error-handling",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority hint attached by the case generator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" | "critical" => Some(Priority::High),
            "medium" | "normal" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    /// Deterministic bucket score used when no ranking is available
    pub fn bucket_score(&self) -> f64 {
        match self {
            Priority::High => 90.0,
            Priority::Medium => 70.0,
            Priority::Low => 50.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_estimated_duration() -> u64 {
    60
}

/// Immutable description of one test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestSpecification {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub steps: Vec<String>,
    pub expected_outcome: String,
    pub validation_criteria: Vec<String>,
    #[serde(default = "default_estimated_duration")]
    pub estimated_duration_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_score: Option<f64>,
}

impl TestSpecification {
    pub fn new(id: &str, name: &str, category: Category, priority: Priority) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category,
            priority,
            steps: Vec::new(),
            expected_outcome: String::new(),
            validation_criteria: Vec::new(),
            estimated_duration_secs: default_estimated_duration(),
            rank_score: None,
        }
    }

    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validation_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expected(mut self, expected: &str) -> Self {
        self.expected_outcome = expected.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Score used for ordering; unranked specs sort as 0
    pub fn score(&self) -> f64 {
        self.rank_score.unwrap_or(0.0)
    }
}

/// Coarse outcome of one test run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Error => "ERROR",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of running one specification once
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub test_case_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub verdict: Verdict,
    /// Set only for `Error`: the uncaught fault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Validation criteria that were not met (populated for `Fail`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmet_criteria: Vec<String>,
    pub artifacts: Vec<String>,
}

impl ExecutionResult {
    pub fn passed(
        test_case_id: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        artifacts: Vec<String>,
    ) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            started_at,
            duration_ms,
            verdict: Verdict::Pass,
            error_message: None,
            unmet_criteria: Vec::new(),
            artifacts,
        }
    }

    pub fn failed(
        test_case_id: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        unmet_criteria: Vec<String>,
        artifacts: Vec<String>,
    ) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            started_at,
            duration_ms,
            verdict: Verdict::Fail,
            error_message: None,
            unmet_criteria,
            artifacts,
        }
    }

    pub fn errored(
        test_case_id: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        error: String,
        artifacts: Vec<String>,
    ) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            started_at,
            duration_ms,
            verdict: Verdict::Error,
            error_message: Some(error),
            unmet_criteria: Vec::new(),
            artifacts,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}
