use async_trait::async_trait;
use chrono::Utc;
use triage_index::IntelligenceIndex;
use triage_store::schema::{Assessment, EmailCategory, Message, StrategicClass, Urgency};

use crate::{Analyzer, AnalyzerContext};

/// §4.3.4. The main weighted attention score: the only analyzer that blends
/// all five factors (category, sender, urgency, recency, thread-presence)
/// into one number, then applies a strategic-sender boost on top.
pub struct TriageAnalyzer;

#[async_trait]
impl Analyzer for TriageAnalyzer {
    fn name(&self) -> &'static str {
        "triage"
    }

    async fn assess(&self, message: &Message, index: &IntelligenceIndex, ctx: &AnalyzerContext<'_>) -> Assessment {
        let category_factor = category_weight(message.category);

        let profile = index.sender_profile(&message.sender.address);
        let base_sender_factor = match &profile {
            Some(p) => p.importance_score / 100.0,
            None => 0.4,
        };
        let sender_factor = (base_sender_factor + crate::learned_sender_offset(ctx, &message.sender.address)).clamp(0.0, 1.0);

        let keyword_urgency = keyword_urgency_factor(&message.subject, &message.body_text, ctx);
        let urgency_factor = if keyword_urgency < 0.5 {
            if let Some(llm) = ctx.llm {
                let text = format!("Subject: {}\n\n{}", message.subject, message.body_text);
                match triage_llm::urgency_score(llm, &text, ctx.llm_timeout, ctx.llm_backoff).await {
                    Ok(score) => score.score.clamp(0.0, 1.0).max(keyword_urgency),
                    Err(err) => {
                        tracing::warn!(error = %err, "triage analyzer: llm unavailable, using keyword urgency only");
                        keyword_urgency
                    }
                }
            } else {
                keyword_urgency
            }
        } else {
            keyword_urgency
        };

        let recency_factor = recency_weight(message);
        let thread_factor = if index.thread_profile(&message.thread_id).is_some() { 0.6 } else { 0.3 };

        let base_score = 0.30 * category_factor
            + 0.25 * sender_factor
            + 0.20 * urgency_factor
            + 0.15 * recency_factor
            + 0.10 * thread_factor;

        let strategic_boost = match profile.as_ref().map(|p| p.strategic_class) {
            Some(StrategicClass::Critical) => 0.40,
            Some(StrategicClass::High) => 0.25,
            Some(StrategicClass::Medium) => 0.10,
            _ => 0.0,
        };

        let priority_score = (base_score + strategic_boost).clamp(0.0, 1.0);

        let urgency = if urgency_factor >= 0.8 {
            Urgency::Critical
        } else if urgency_factor >= 0.6 {
            Urgency::High
        } else if urgency_factor >= 0.3 {
            Urgency::Medium
        } else {
            Urgency::Low
        };

        Assessment {
            analyzer_name: self.name().to_string(),
            priority_score,
            confidence: 0.75,
            urgency,
            suggested_labels: Vec::new(),
            risks: Vec::new(),
            opportunities: Vec::new(),
            rationale: format!(
                "attention = 0.30*cat({category_factor:.2}) + 0.25*sender({sender_factor:.2}) + 0.20*urgency({urgency_factor:.2}) \
                 + 0.15*recency({recency_factor:.2}) + 0.10*thread({thread_factor:.2}) + boost({strategic_boost:.2})"
            ),
        }
    }
}

fn category_weight(category: EmailCategory) -> f32 {
    match category {
        EmailCategory::Primary => 0.8,
        EmailCategory::Updates => 0.3,
        EmailCategory::Social => 0.2,
        EmailCategory::Promotions => 0.1,
        EmailCategory::Forums => 0.4,
        EmailCategory::Spam => 0.0,
    }
}

const URGENT_KEYWORDS: &[(&str, f32)] = &[
    ("urgent", 0.9),
    ("asap", 0.9),
    ("immediate", 0.8),
    ("deadline", 0.8),
    ("important", 0.7),
    ("please respond", 0.6),
    ("follow up", 0.5),
];

/// Subject keywords score at face value; the same keywords found only in the
/// body are discounted ×0.8 since subject-line urgency is a stronger signal.
/// A keyword the learner has marked a false positive (§4.6: repeatedly
/// AUTO_ARCHIVEd despite matching) is skipped, and body tokens the learner
/// has associated with PRIORITY corrections contribute their learned weight.
fn keyword_urgency_factor(subject: &str, body: &str, ctx: &AnalyzerContext<'_>) -> f32 {
    let subject_lower = subject.to_lowercase();
    let body_lower = body.to_lowercase();

    let mut best = 0.0f32;
    for (keyword, weight) in URGENT_KEYWORDS {
        if ctx.learner_weights.is_some_and(|w| w.false_positive_keywords.contains(*keyword)) {
            continue;
        }
        if subject_lower.contains(keyword) {
            best = best.max(*weight);
        } else if body_lower.contains(keyword) {
            best = best.max(*weight * 0.8);
        }
    }

    if let Some(weights) = ctx.learner_weights {
        for token in body_lower.split(|c: char| !c.is_alphanumeric()) {
            if let Some(learned) = weights.token_urgency_weights.get(token) {
                best = best.max(*learned);
            }
        }
    }

    best
}

fn recency_weight(message: &Message) -> f32 {
    let age = Utc::now().signed_duration_since(message.sent_at);
    if age <= chrono::Duration::hours(1) {
        1.0
    } else if age <= chrono::Duration::hours(6) {
        0.8
    } else if age <= chrono::Duration::days(1) {
        0.6
    } else if age <= chrono::Duration::days(3) {
        0.4
    } else if age <= chrono::Duration::days(7) {
        0.2
    } else {
        0.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_config::IndexConfig;

    #[tokio::test]
    async fn fresh_primary_message_with_urgent_subject_scores_high() {
        let index = IntelligenceIndex::new(IndexConfig::default());
        let analyzer = TriageAnalyzer;
        let ctx = AnalyzerContext { llm: None, llm_timeout: std::time::Duration::from_secs(1), llm_backoff: std::time::Duration::from_millis(1), learner_weights: None };
        let message = crate::test_support::sample_message("a@b.com", "URGENT: need this ASAP", "body text");
        let assessment = analyzer.assess(&message, &index, &ctx).await;
        assert!(assessment.priority_score > 0.5, "expected > 0.5, got {}", assessment.priority_score);
        assert_eq!(assessment.urgency, Urgency::Critical);
    }

    #[test]
    fn category_weight_matches_fixed_table() {
        assert_eq!(category_weight(EmailCategory::Primary), 0.8);
        assert_eq!(category_weight(EmailCategory::Spam), 0.0);
        assert_eq!(category_weight(EmailCategory::Forums), 0.4);
    }

    #[test]
    fn body_only_keyword_is_discounted() {
        let ctx = AnalyzerContext { llm: None, llm_timeout: std::time::Duration::from_secs(1), llm_backoff: std::time::Duration::from_millis(1), learner_weights: None };
        let subject_hit = keyword_urgency_factor("urgent", "nothing special", &ctx);
        let body_hit = keyword_urgency_factor("nothing special", "this is urgent", &ctx);
        assert_eq!(subject_hit, 0.9);
        assert_eq!(body_hit, 0.9 * 0.8);
    }

    #[test]
    fn false_positive_keyword_is_ignored() {
        use std::collections::{HashMap, HashSet};
        use triage_store::schema::LearnerWeights;

        let weights = LearnerWeights {
            sender_weights: HashMap::new(),
            token_urgency_weights: HashMap::new(),
            false_positive_keywords: HashSet::from(["urgent".to_string()]),
        };
        let ctx = AnalyzerContext {
            llm: None,
            llm_timeout: std::time::Duration::from_secs(1),
            llm_backoff: std::time::Duration::from_millis(1),
            learner_weights: Some(&weights),
        };
        assert_eq!(keyword_urgency_factor("urgent: status", "nothing else", &ctx), 0.0);
    }
}
