use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::{priority_scores, sort_by_score, Ranker};
use crate::error::LlmError;
use crate::llm::ChatModel;
use crate::model::TestSpecification;

const SYSTEM_PROMPT: &str = "You are a test prioritization expert. Rank test cases by importance.

Consider:
1. Risk coverage (critical functionality)
2. User impact (how failure affects users)
3. Automation reliability (easy to automate)
4. Execution efficiency (time/resources)

Score each test 0-100 (higher = more important).";

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\s\-*]*`?([A-Za-z0-9_\-]+)`?\s*[:=]\s*(-?\d+(?:\.\d+)?)").expect("static regex")
    })
}

/// `id: score` lines; later lines for the same id win
pub fn parse_scores(reply: &str) -> HashMap<String, f64> {
    reply
        .lines()
        .filter_map(|line| {
            let caps = score_regex().captures(line.trim())?;
            let score: f64 = caps[2].parse().ok()?;
            Some((caps[1].to_string(), score.clamp(0.0, 100.0)))
        })
        .collect()
}

fn ranking_prompt(specs: &[TestSpecification]) -> String {
    let summaries: Vec<String> = specs
        .iter()
        .map(|s| {
            format!(
                "ID: {} | Name: {} | Type: {} | Priority: {}",
                s.id, s.name, s.category, s.priority
            )
        })
        .collect();

    format!(
        "Rank these test cases by importance (0-100 score):

{}

Return format:
test_001: 95
test_002: 87
...",
        summaries.join("\n")
    )
}

/// Ranker backed by a chat model, falling back to priority buckets
pub struct LlmRanker {
    model: Option<Arc<dyn ChatModel>>,
    temperature: f32,
}

impl LlmRanker {
    pub fn new(model: Option<Arc<dyn ChatModel>>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    async fn ask(&self, specs: &[TestSpecification]) -> Result<HashMap<String, f64>, LlmError> {
        let model = self.model.as_ref().ok_or(LlmError::NotConfigured)?;
        let reply = model
            .complete(SYSTEM_PROMPT, &ranking_prompt(specs), self.temperature)
            .await?;

        let mut scores = parse_scores(&reply);
        scores.retain(|id, _| specs.iter().any(|s| &s.id == id));
        if scores.is_empty() {
            return Err(LlmError::Unparsable("no known test ids scored".to_string()));
        }
        Ok(scores)
    }
}

#[async_trait]
impl Ranker for LlmRanker {
    async fn rank(&self, mut specs: Vec<TestSpecification>) -> Vec<TestSpecification> {
        if specs.is_empty() {
            return specs;
        }

        log::info!("Ranking {} test cases", specs.len());
        match self.ask(&specs).await {
            Ok(scores) => {
                for spec in specs.iter_mut() {
                    let score = scores
                        .get(&spec.id)
                        .copied()
                        .unwrap_or_else(|| spec.priority.bucket_score());
                    spec.rank_score = Some(score);
                }
            }
            Err(e) => {
                log::warn!("Ranking failed ({}), using priority buckets", e);
                priority_scores(&mut specs);
            }
        }

        sort_by_score(&mut specs);
        specs
    }
}
