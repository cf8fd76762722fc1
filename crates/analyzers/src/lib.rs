//! Five independent analyzers (§4.3), each producing an [`Assessment`] from
//! `IntelligenceIndex` state and an optional LLM call. Every analyzer
//! tolerates index misses and LLM errors by degrading to a low-confidence
//! assessment rather than failing.

pub mod relationship;
pub mod spam;
pub mod strategic;
#[cfg(test)]
mod test_support;
pub mod thread;
pub mod triage;

use async_trait::async_trait;
use std::time::Duration;
use triage_index::IntelligenceIndex;
use triage_llm::LlmClient;
use triage_store::schema::{Assessment, LearnerWeights, Message};

pub use relationship::RelationshipAnalyzer;
pub use spam::SpamFilter;
pub use strategic::StrategicAnalyzer;
pub use thread::ThreadAnalyzer;
pub use triage::TriageAnalyzer;

/// Options threaded through every analyzer call: the LLM call budget and an
/// optional client (`None` models an LLM-disabled deployment, which every
/// analyzer treats the same as an LLM error — fall back to heuristics).
#[derive(Clone, Copy)]
pub struct AnalyzerContext<'a> {
    pub llm: Option<&'a dyn LlmClient>,
    pub llm_timeout: Duration,
    pub llm_backoff: Duration,
    /// Persisted feedback-learner state (§4.6), consumed by `StrategicAnalyzer`
    /// and `TriageAnalyzer` so a correction applied in a prior run shapes this
    /// one. `None` when no learner state has been persisted yet.
    pub learner_weights: Option<&'a LearnerWeights>,
}

/// The learner's absolute sender weight (default 0.5) expressed as a delta
/// from neutral, additively applied on top of the index-derived importance
/// score rather than replacing it.
pub(crate) fn learned_sender_offset(ctx: &AnalyzerContext<'_>, address: &str) -> f32 {
    ctx.learner_weights.and_then(|w| w.sender_weights.get(&address.to_lowercase())).map(|weight| weight - 0.5).unwrap_or(0.0)
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn assess(&self, message: &Message, index: &IntelligenceIndex, ctx: &AnalyzerContext<'_>) -> Assessment;
}

/// Runs the five analyzers concurrently for a single message (§4.3, §5):
/// cross-message concurrency is the scheduler's worker pool, this is the
/// per-message fan-out within one of those workers.
pub async fn run_all(message: &Message, index: &IntelligenceIndex, ctx: &AnalyzerContext<'_>) -> Vec<Assessment> {
    let analyzers: Vec<Box<dyn Analyzer>> = vec![
        Box::new(StrategicAnalyzer),
        Box::new(RelationshipAnalyzer),
        Box::new(ThreadAnalyzer),
        Box::new(TriageAnalyzer),
        Box::new(SpamFilter),
    ];

    futures::future::join_all(analyzers.iter().map(|analyzer| analyzer.assess(message, index, ctx))).await
}
