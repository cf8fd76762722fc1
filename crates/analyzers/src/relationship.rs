use async_trait::async_trait;
use triage_index::IntelligenceIndex;
use triage_store::schema::{Assessment, Message, RelationshipClass, Urgency};

use crate::{Analyzer, AnalyzerContext};

/// §4.3.2. Uses the contact graph, falling back to the static
/// strategic-domains map for senders with no observed history.
pub struct RelationshipAnalyzer;

#[async_trait]
impl Analyzer for RelationshipAnalyzer {
    fn name(&self) -> &'static str {
        "relationship"
    }

    async fn assess(&self, message: &Message, index: &IntelligenceIndex, _ctx: &AnalyzerContext<'_>) -> Assessment {
        let profile = index.sender_profile(&message.sender.address);
        let (class, known) = match &profile {
            Some(p) => (p.relationship_class, true),
            None => {
                let domain = message.sender.address.rsplit('@').next().unwrap_or("");
                (index.classify_domain(domain), false)
            }
        };

        let priority_score = relationship_score(class);
        let urgency = match class {
            RelationshipClass::Founder | RelationshipClass::Board => Urgency::High,
            RelationshipClass::Investor | RelationshipClass::VendorCritical | RelationshipClass::Team => Urgency::Medium,
            _ => Urgency::Low,
        };
        let confidence = if known { 0.85 } else { 0.5 };

        Assessment {
            analyzer_name: self.name().to_string(),
            priority_score,
            confidence,
            urgency,
            suggested_labels: Vec::new(),
            risks: Vec::new(),
            opportunities: Vec::new(),
            rationale: format!("relationship class {class:?} ({})", if known { "observed" } else { "domain fallback" }),
        }
    }
}

/// Fixed table (§4.3.2). Team colleagues score far below Board/Investor —
/// confirmed against `relationship_intelligence.py`'s "internal" (25pts) vs
/// "team" (10pts) split, where team stays a low-priority bucket rather than
/// the organization's top relationship tier.
fn relationship_score(class: RelationshipClass) -> f32 {
    use RelationshipClass::*;
    match class {
        Founder => 0.98,
        Team => 0.55,
        Board => 0.95,
        Investor => 0.90,
        Advisor => 0.75,
        VendorCritical => 0.70,
        Customer => 0.60,
        VendorImportant => 0.45,
        Vendor => 0.30,
        Unknown => 0.40,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_config::IndexConfig;

    #[tokio::test]
    async fn founder_sender_scores_highest() {
        let config = IndexConfig { strategic_domains: vec![("foundersvc.com".to_string(), "FOUNDER".to_string())], ..Default::default() };
        let index = IntelligenceIndex::new(config);
        let analyzer = RelationshipAnalyzer;
        let ctx = AnalyzerContext { llm: None, llm_timeout: std::time::Duration::from_secs(1), llm_backoff: std::time::Duration::from_millis(1), learner_weights: None };
        let message = crate::test_support::sample_message("jane@foundersvc.com", "hi", "body");
        let assessment = analyzer.assess(&message, &index, &ctx).await;
        assert_eq!(assessment.priority_score, 0.98);
        assert_eq!(assessment.confidence, 0.5);
    }

    #[tokio::test]
    async fn unknown_sender_defaults_to_unknown_score() {
        let index = IntelligenceIndex::new(IndexConfig::default());
        let analyzer = RelationshipAnalyzer;
        let ctx = AnalyzerContext { llm: None, llm_timeout: std::time::Duration::from_secs(1), llm_backoff: std::time::Duration::from_millis(1), learner_weights: None };
        let message = crate::test_support::sample_message("stranger@nowhere.com", "hi", "body");
        let assessment = analyzer.assess(&message, &index, &ctx).await;
        assert_eq!(assessment.priority_score, 0.40);
    }
}
