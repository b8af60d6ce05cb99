//! Test case prioritisation

mod llm;

pub use llm::LlmRanker;

use async_trait::async_trait;

use crate::model::TestSpecification;

/// Attaches a score to every specification and orders them by it
#[async_trait]
pub trait Ranker: Send + Sync {
    /// Same set of specifications, each with `rank_score` set, sorted by
    /// descending score. Equal scores keep their input order.
    async fn rank(&self, specs: Vec<TestSpecification>) -> Vec<TestSpecification>;
}

/// Stable sort, highest score first
pub fn sort_by_score(specs: &mut [TestSpecification]) {
    specs.sort_by(|a, b| b.score().total_cmp(&a.score()));
}

/// Score every specification by its priority bucket
pub fn priority_scores(specs: &mut [TestSpecification]) {
    for spec in specs.iter_mut() {
        spec.rank_score = Some(spec.priority.bucket_score());
    }
}

/// Ranker that only looks at declared priority
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityRanker;

#[async_trait]
impl Ranker for PriorityRanker {
    async fn rank(&self, mut specs: Vec<TestSpecification>) -> Vec<TestSpecification> {
        priority_scores(&mut specs);
        sort_by_score(&mut specs);
        specs
    }
}
