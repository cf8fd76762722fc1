//! Periodic rule synthesis (§4.6): scan a window of messages + their final
//! decisions for stable sender→bucket and subject-keyword→bucket patterns,
//! emit `LearnedPattern`s, and promote the confident ones to `Rule`s.

use std::collections::HashMap;

use chrono::Utc;
use triage_config::LearnerConfig;
use triage_store::schema::{ConditionField, ConditionOperator, Rule, RuleActions, RuleCondition, TriageBucket};
use triage_store::schema::{LearnedPattern, PatternKind};

const STOPWORDS: &[&str] = &["the", "a", "an", "and", "or", "to", "of", "for", "in", "on", "is", "re", "fwd"];

pub struct ObservedDecision<'a> {
    pub sender_address: &'a str,
    pub subject: &'a str,
    pub bucket: TriageBucket,
}

/// Tally `(key, bucket)` occurrences and, for each key with enough samples
/// and a dominant-enough bucket, emit a `LearnedPattern`.
fn synthesize(
    keys_and_buckets: impl Iterator<Item = (String, TriageBucket)>,
    kind: PatternKind,
    sample_threshold: usize,
    confidence_threshold: f32,
) -> Vec<LearnedPattern> {
    let mut tallies: HashMap<String, HashMap<TriageBucket, u32>> = HashMap::new();
    for (key, bucket) in keys_and_buckets {
        *tallies.entry(key).or_default().entry(bucket).or_insert(0) += 1;
    }

    let mut patterns = Vec::new();
    for (key, buckets) in tallies {
        let total: u32 = buckets.values().sum();
        if (total as usize) < sample_threshold {
            continue;
        }
        let (dominant_bucket, dominant_count) = buckets.iter().max_by_key(|(_, count)| **count).map(|(b, c)| (*b, *c)).unwrap();
        let confidence = dominant_count as f32 / total as f32;
        if confidence < confidence_threshold {
            continue;
        }
        patterns.push(LearnedPattern {
            kind,
            key,
            predicted_attribute: "bucket".to_string(),
            predicted_value: format!("{dominant_bucket:?}"),
            confidence,
            sample_size: total,
            updated_at: Utc::now(),
        });
    }
    patterns
}

/// Scan sender addresses and normalized subject keywords across `decisions`.
pub fn synthesize_patterns(decisions: &[ObservedDecision], config: &LearnerConfig) -> Vec<LearnedPattern> {
    let mut patterns = synthesize(
        decisions.iter().map(|d| (d.sender_address.to_lowercase(), d.bucket)),
        PatternKind::SenderCategory,
        config.sender_sample_threshold,
        config.confidence_threshold,
    );

    let keyword_pairs = decisions.iter().flat_map(|d| subject_keywords(d.subject).into_iter().map(move |k| (k, d.bucket)));
    patterns.extend(synthesize(
        keyword_pairs,
        PatternKind::SubjectKeywordCategory,
        config.keyword_sample_threshold,
        config.confidence_threshold,
    ));

    patterns
}

fn subject_keywords(subject: &str) -> Vec<String> {
    subject
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Promote patterns with confidence ≥ `promote_to_rule_threshold` to `Rule`s;
/// auto-enable those with confidence ≥ `auto_enable_threshold` (§4.6).
pub fn promote_to_rules(patterns: &[LearnedPattern], config: &LearnerConfig) -> Vec<Rule> {
    patterns
        .iter()
        .filter(|p| p.confidence >= config.promote_to_rule_threshold)
        .map(|p| {
            let (field, priority) = match p.kind {
                PatternKind::SenderCategory => (ConditionField::SenderAddress, 100),
                PatternKind::SubjectKeywordCategory | PatternKind::SubjectKeywordPriority => (ConditionField::Subject, 101),
                PatternKind::ContentFeature => (ConditionField::BodyText, 102),
                PatternKind::Temporal => (ConditionField::Subject, 102),
            };
            Rule {
                id: format!("learned_{}_{}", format!("{:?}", p.kind).to_lowercase(), p.key.replace(['@', '.', ' '], "_")),
                name: format!("Learned: {} -> {}", p.key, p.predicted_value),
                enabled: p.confidence >= config.auto_enable_threshold,
                priority,
                conditions: vec![RuleCondition { field, operator: ConditionOperator::Contains, value: p.key.clone(), case_sensitive: false }],
                actions: RuleActions { add_tags: vec![format!("learned:{}", p.predicted_value.to_lowercase())], ..Default::default() },
                compile_error: None,
                matches: 0,
                matches_correct: 0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_sender_pattern_is_synthesized_with_enough_samples() {
        let config = LearnerConfig::default();
        let decisions: Vec<ObservedDecision> = (0..6)
            .map(|_| ObservedDecision { sender_address: "boss@company.com", subject: "update", bucket: TriageBucket::PriorityInbox })
            .collect();
        let patterns = synthesize_patterns(&decisions, &config);
        assert!(patterns.iter().any(|p| p.kind == PatternKind::SenderCategory && p.key == "boss@company.com"));
    }

    #[test]
    fn noisy_pattern_below_confidence_threshold_is_not_emitted() {
        let config = LearnerConfig::default();
        let decisions = vec![
            ObservedDecision { sender_address: "x@y.com", subject: "s", bucket: TriageBucket::PriorityInbox },
            ObservedDecision { sender_address: "x@y.com", subject: "s", bucket: TriageBucket::AutoArchive },
            ObservedDecision { sender_address: "x@y.com", subject: "s", bucket: TriageBucket::RegularInbox },
            ObservedDecision { sender_address: "x@y.com", subject: "s", bucket: TriageBucket::SpamFolder },
            ObservedDecision { sender_address: "x@y.com", subject: "s", bucket: TriageBucket::PriorityInbox },
        ];
        let patterns = synthesize_patterns(&decisions, &config);
        assert!(!patterns.iter().any(|p| p.key == "x@y.com"));
    }

    #[test]
    fn high_confidence_pattern_promotes_to_an_auto_enabled_rule() {
        let config = LearnerConfig::default();
        let pattern = LearnedPattern {
            kind: PatternKind::SenderCategory,
            key: "boss@company.com".to_string(),
            predicted_attribute: "bucket".to_string(),
            predicted_value: "PriorityInbox".to_string(),
            confidence: 0.95,
            sample_size: 10,
            updated_at: Utc::now(),
        };
        let rules = promote_to_rules(&[pattern], &config);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].enabled);
        assert_eq!(rules[0].priority, 100);
    }
}
