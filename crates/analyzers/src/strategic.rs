use async_trait::async_trait;
use triage_index::IntelligenceIndex;
use triage_store::schema::{Assessment, Message, StrategicClass, Urgency};

use crate::{Analyzer, AnalyzerContext};

/// §4.3.1. Uses `SenderProfile` + LLM.
pub struct StrategicAnalyzer;

#[async_trait]
impl Analyzer for StrategicAnalyzer {
    fn name(&self) -> &'static str {
        "strategic"
    }

    async fn assess(&self, message: &Message, index: &IntelligenceIndex, ctx: &AnalyzerContext<'_>) -> Assessment {
        let profile = index.sender_profile(&message.sender.address);
        let (importance_score, strategic_class, total_messages) = match &profile {
            Some(p) => (p.importance_score, p.strategic_class, p.total_messages),
            None => (40.0, StrategicClass::Low, 0),
        };

        let class_nudge = match strategic_class {
            StrategicClass::Critical => 0.05,
            StrategicClass::High => 0.0,
            StrategicClass::Medium => -0.05,
            StrategicClass::Low => -0.10,
        };
        let sender_offset = crate::learned_sender_offset(ctx, &message.sender.address);
        let priority_score = (importance_score / 100.0 + class_nudge + sender_offset).clamp(0.0, 1.0);

        let confidence = if matches!(strategic_class, StrategicClass::Critical) {
            0.95
        } else if total_messages > 5 {
            0.8
        } else if total_messages > 2 {
            0.6
        } else {
            0.3
        };

        let urgency = match strategic_class {
            StrategicClass::Critical => Urgency::High,
            StrategicClass::High => Urgency::Medium,
            _ => Urgency::Low,
        };

        let mut suggested_labels = Vec::new();
        let mut rationale = if sender_offset != 0.0 {
            format!("sender importance {importance_score:.0}/100, class {strategic_class:?}, learned offset {sender_offset:+.2}")
        } else {
            format!("sender importance {importance_score:.0}/100, class {strategic_class:?}")
        };

        if let Some(llm) = ctx.llm {
            let text = format!("Subject: {}\n\n{}", message.subject, message.body_text);
            match triage_llm::strategic_analysis(llm, &text, ctx.llm_timeout, ctx.llm_backoff).await {
                Ok(analysis) => {
                    suggested_labels = analysis.labels;
                    rationale = analysis.key_insight;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "strategic analyzer: llm unavailable, using sender-profile heuristic only");
                }
            }
        }

        Assessment {
            analyzer_name: self.name().to_string(),
            priority_score,
            confidence,
            urgency,
            suggested_labels,
            risks: Vec::new(),
            opportunities: Vec::new(),
            rationale,
        }
    }
}
