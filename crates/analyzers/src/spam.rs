use async_trait::async_trait;
use triage_index::IntelligenceIndex;
use triage_store::schema::{Assessment, Message, StrategicClass, Urgency};

use crate::{Analyzer, AnalyzerContext};

/// Sentinel the collaborator stage (§4.5) looks for in `suggested_labels` to
/// apply the hard spam veto regardless of every other analyzer's score.
pub const SPAM_VETO_LABEL: &str = "spam_veto";

const CONTENT_INDICATORS: &[&str] = &[
    "winner", "congratulations", "claim now", "claim your", "act now", "cash prize",
    "limited time", "click here", "lottery", "risk free", "free money", "work from home",
    "urgent reply needed", "verify your account",
];

const SUSPICIOUS_TLDS: &[&str] = &["xyz", "top", "click", "win", "loan", "icu", "work", "biz"];

/// Spam-pattern words that, appearing in the domain itself, make it
/// suspicious regardless of TLD — grounded on `enhanced_ceo_labeler.py`'s
/// `_is_promotional_spam`, which flags a sender address containing words
/// like "noreply"/"marketing"/"promo" independent of content scoring.
const SUSPICIOUS_DOMAIN_WORDS: &[&str] = &["lottery", "prize", "winner", "cashprize", "freemoney", "promo", "bonus"];

/// §4.3.5. A hard veto, not a weighted score: if the message trips enough
/// content indicators AND the sender domain looks suspicious AND the sender
/// isn't already a trusted (HIGH/CRITICAL) relationship, force SPAM_FOLDER
/// regardless of what the other four analyzers say.
pub struct SpamFilter;

#[async_trait]
impl Analyzer for SpamFilter {
    fn name(&self) -> &'static str {
        "spam"
    }

    async fn assess(&self, message: &Message, index: &IntelligenceIndex, _ctx: &AnalyzerContext<'_>) -> Assessment {
        let indicator_hits = count_indicators(&message.subject, &message.body_text);
        let domain = message.sender.address.rsplit('@').next().unwrap_or("");
        let suspicious_domain = is_suspicious_domain(domain);

        let trusted = index
            .sender_profile(&message.sender.address)
            .map(|p| matches!(p.strategic_class, StrategicClass::High | StrategicClass::Critical))
            .unwrap_or(false);

        let vetoed = indicator_hits >= 2 && suspicious_domain && !trusted;

        let suggested_labels = if vetoed { vec![SPAM_VETO_LABEL.to_string()] } else { Vec::new() };
        let rationale = if vetoed {
            format!("{indicator_hits} spam indicators + suspicious domain {domain}, sender untrusted")
        } else {
            format!("{indicator_hits} spam indicators, suspicious_domain={suspicious_domain}, trusted={trusted}")
        };

        Assessment {
            analyzer_name: self.name().to_string(),
            priority_score: if vetoed { 0.0 } else { 1.0 },
            confidence: if vetoed { 0.9 } else { 0.6 },
            urgency: Urgency::Low,
            suggested_labels,
            risks: Vec::new(),
            opportunities: Vec::new(),
            rationale,
        }
    }
}

fn count_indicators(subject: &str, body: &str) -> usize {
    let haystack = format!("{subject} {body}").to_lowercase();
    CONTENT_INDICATORS.iter().filter(|needle| haystack.contains(*needle)).count()
}

fn is_suspicious_domain(domain: &str) -> bool {
    let domain = domain.to_lowercase();
    let has_digit = domain.chars().any(|c| c.is_ascii_digit());
    let many_hyphens = domain.matches('-').count() >= 2;
    let suspicious_tld = SUSPICIOUS_TLDS.iter().any(|tld| domain.ends_with(&format!(".{tld}")));
    let suspicious_word = SUSPICIOUS_DOMAIN_WORDS.iter().any(|word| domain.contains(word));
    suspicious_tld || suspicious_word || (has_digit && many_hyphens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_config::IndexConfig;

    #[tokio::test]
    async fn multi_indicator_content_from_suspicious_domain_is_vetoed() {
        let index = IntelligenceIndex::new(IndexConfig::default());
        let analyzer = SpamFilter;
        let ctx = AnalyzerContext { llm: None, llm_timeout: std::time::Duration::from_secs(1), llm_backoff: std::time::Duration::from_millis(1), learner_weights: None };
        let message = crate::test_support::sample_message(
            "winner@lottery-prize123.xyz",
            "CONGRATULATIONS you have WON",
            "claim now, this is a limited time cash prize, click here immediately",
        );
        let assessment = analyzer.assess(&message, &index, &ctx).await;
        assert!(assessment.suggested_labels.contains(&SPAM_VETO_LABEL.to_string()));
        assert_eq!(assessment.priority_score, 0.0);
    }

    #[tokio::test]
    async fn lottery_prize_example_domain_is_vetoed() {
        let index = IntelligenceIndex::new(IndexConfig::default());
        let analyzer = SpamFilter;
        let ctx = AnalyzerContext { llm: None, llm_timeout: std::time::Duration::from_secs(1), llm_backoff: std::time::Duration::from_millis(1), learner_weights: None };
        let message = crate::test_support::sample_message(
            "winner@lottery-prize.example",
            "CONGRATULATIONS you have WON",
            "claim now, this is a limited time cash prize, click here immediately",
        );
        let assessment = analyzer.assess(&message, &index, &ctx).await;
        assert!(assessment.suggested_labels.contains(&SPAM_VETO_LABEL.to_string()));
        assert_eq!(assessment.priority_score, 0.0);
    }

    #[tokio::test]
    async fn ordinary_message_is_not_vetoed() {
        let index = IntelligenceIndex::new(IndexConfig::default());
        let analyzer = SpamFilter;
        let ctx = AnalyzerContext { llm: None, llm_timeout: std::time::Duration::from_secs(1), llm_backoff: std::time::Duration::from_millis(1), learner_weights: None };
        let message = crate::test_support::sample_message("colleague@acme.com", "project update", "here's the status");
        let assessment = analyzer.assess(&message, &index, &ctx).await;
        assert!(assessment.suggested_labels.is_empty());
    }
}
