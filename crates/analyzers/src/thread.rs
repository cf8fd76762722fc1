use async_trait::async_trait;
use triage_index::IntelligenceIndex;
use triage_store::schema::{Assessment, Message, ThreadProfile, ThreadStatus, ThreadType, Urgency};

use crate::{Analyzer, AnalyzerContext};

/// Threads with ≥3 messages get an LLM-backed summary (§11 SUPPLEMENT); its
/// next steps surface as opportunities and its decisions as risk-adjacent
/// context, falling back to nothing extra on any LLM error.
const MIN_MESSAGES_FOR_SUMMARY: usize = 3;

/// §4.3.3. Uses `ThreadProfile`; a message with no known thread history
/// (single-message thread, index not yet refreshed) gets a low-confidence
/// discussion/active default.
pub struct ThreadAnalyzer;

#[async_trait]
impl Analyzer for ThreadAnalyzer {
    fn name(&self) -> &'static str {
        "thread"
    }

    async fn assess(&self, message: &Message, index: &IntelligenceIndex, ctx: &AnalyzerContext<'_>) -> Assessment {
        let profile = index.thread_profile(&message.thread_id);

        let (thread_type, status, known) = match &profile {
            Some(p) => (p.thread_type, p.status, true),
            None => (ThreadType::Discussion, ThreadStatus::Active, false),
        };

        let priority_score = (type_base(thread_type) * status_multiplier(status)).clamp(0.0, 1.0);
        let confidence = if known { 0.8 } else { 0.3 };
        let urgency = match status {
            ThreadStatus::Escalated => Urgency::High,
            ThreadStatus::Stalled => Urgency::Medium,
            _ => Urgency::Low,
        };

        let mut risks = Vec::new();
        if matches!(thread_type, ThreadType::Decision) && matches!(status, ThreadStatus::Stalled) {
            risks.push(format!("thread {} is a stalled decision thread", message.thread_id));
        }

        let mut opportunities = Vec::new();
        if let Some(client) = ctx.llm
            && let Some(p) = profile.as_ref().filter(|p| p.message_count >= MIN_MESSAGES_FOR_SUMMARY)
        {
            match triage_llm::thread_summary(client, &thread_digest(p, message), ctx.llm_timeout, ctx.llm_backoff).await {
                Ok(summary) => {
                    opportunities.extend(summary.next_steps.into_iter().map(|s| format!("next step: {s}")));
                    risks.extend(summary.key_decisions.into_iter().map(|d| format!("open decision: {d}")));
                }
                Err(err) => {
                    tracing::warn!(error = %err, thread_id = %message.thread_id, "thread analyzer: llm summary unavailable");
                }
            }
        }

        Assessment {
            analyzer_name: self.name().to_string(),
            priority_score,
            confidence,
            urgency,
            suggested_labels: Vec::new(),
            risks,
            opportunities,
            rationale: format!("thread type {thread_type:?}, status {status:?}"),
        }
    }
}

fn thread_digest(profile: &ThreadProfile, latest: &Message) -> String {
    format!(
        "Subjects: {}. Topics: {}. Latest message: {}",
        profile.subject_evolution.join(" / "),
        profile.key_topics.join(", "),
        latest.body_text
    )
}

fn type_base(thread_type: ThreadType) -> f32 {
    match thread_type {
        ThreadType::Decision => 0.80,
        ThreadType::Escalation => 0.85,
        ThreadType::Discussion => 0.60,
        ThreadType::Transactional => 0.40,
    }
}

fn status_multiplier(status: ThreadStatus) -> f32 {
    match status {
        ThreadStatus::Active => 1.0,
        ThreadStatus::Stalled => 1.2,
        ThreadStatus::Escalated => 1.3,
        ThreadStatus::Dormant => 0.7,
        ThreadStatus::Resolved => 0.3,
    }
}
