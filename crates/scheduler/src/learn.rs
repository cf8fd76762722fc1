//! Learn phase (§4.6): replay the feedback log against persisted decisions
//! to update rule accuracy counters, then synthesize and promote patterns
//! into rules. Recomputed from the full feedback log each run rather than
//! tracked incrementally — the same rebuild-from-source-of-truth approach
//! `IntelligenceIndex::rebuild_full` uses for sender/thread aggregates.

use std::collections::HashMap;

use tracing::{info, instrument};
use triage_config::LearnerConfig;
use triage_learner::patterns::{self, ObservedDecision};
use triage_learner::rules::{self, RuleSuggestion};
use triage_store::Store;

pub struct LearnOutcome {
    pub rules_scored: usize,
    pub patterns_synthesized: usize,
    pub rules_promoted: usize,
    pub suggestions: Vec<RuleSuggestion>,
}

/// Score every rule that fired on a message later corrected by feedback,
/// synthesize sender/keyword patterns from the corrected buckets, and
/// promote confident patterns to rules (§4.6).
#[instrument(skip(store, config))]
pub fn run_learn_phase(store: &Store, config: &LearnerConfig) -> Result<LearnOutcome, triage_store::StorageError> {
    let feedback = store.list_feedback(None)?;
    let mut rules = store.list_rules(false)?;
    let rule_index: HashMap<String, usize> = rules.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();

    let all_messages = store.query_messages(&Default::default(), triage_store::Pagination { offset: 0, limit: usize::MAX });

    let mut scored = 0usize;
    let mut observed = Vec::new();
    for fb in &feedback {
        let Some(decision) = store.get_decision(&fb.message_id)? else { continue };
        for rule_id in &decision.rules_fired {
            if let Some(&idx) = rule_index.get(rule_id) {
                let predicted_correct = decision.bucket == fb.corrected_bucket;
                rules::record_rule_match(&mut rules[idx], predicted_correct);
                scored += 1;
            }
        }

        let Some(message) = all_messages.iter().find(|m| m.id == fb.message_id) else { continue };
        observed.push((message.sender.address.clone(), message.subject.clone(), fb.corrected_bucket));
    }

    for rule in &rules {
        store.put_rule(rule)?;
    }

    let observed_decisions: Vec<ObservedDecision> =
        observed.iter().map(|(sender, subject, bucket)| ObservedDecision { sender_address: sender, subject, bucket: *bucket }).collect();
    let synthesized = patterns::synthesize_patterns(&observed_decisions, config);
    for pattern in &synthesized {
        store.put_pattern(pattern)?;
    }

    let promoted = patterns::promote_to_rules(&synthesized, config);
    for rule in &promoted {
        store.put_rule(rule)?;
    }

    let suggestions = rules::suggestions(&rules, config);
    info!(
        scored,
        patterns = synthesized.len(),
        promoted = promoted.len(),
        suggestions = suggestions.len(),
        "learn phase complete"
    );

    Ok(LearnOutcome { rules_scored: scored, patterns_synthesized: synthesized.len(), rules_promoted: promoted.len(), suggestions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use triage_store::schema::{
        Decision, EmailCategory, EmailPriority, Feedback, Message, RuleActions, RuleCondition, SenderAddress, TriageBucket, Urgency,
    };
    use triage_store::schema::{ConditionField, ConditionOperator, Rule};

    fn message(external_id: &str, sender: &str, subject: &str) -> Message {
        let now = Utc::now();
        Message {
            id: uuid::Uuid::new_v4(),
            external_id: external_id.to_string(),
            thread_id: "t1".to_string(),
            sender: SenderAddress { address: sender.to_string(), display_name: None },
            recipients: vec!["me@example.com".to_string()],
            subject: subject.to_string(),
            body_text: "body".to_string(),
            body_html: None,
            sent_at: now,
            received_at: now,
            is_read: false,
            is_flagged: false,
            category: EmailCategory::Primary,
            priority: EmailPriority::Normal,
            tags: HashSet::new(),
            provider_labels: HashSet::new(),
            processing_stamps: HashSet::new(),
            has_attachments: false,
            attachment_count: 0,
            category_inferred: false,
        }
    }

    fn rule(id: &str) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            enabled: true,
            priority: 10,
            conditions: vec![RuleCondition { field: ConditionField::Subject, operator: ConditionOperator::Contains, value: "x".to_string(), case_sensitive: false }],
            actions: RuleActions::default(),
            compile_error: None,
            matches: 0,
            matches_correct: 0,
        }
    }

    #[tokio::test]
    async fn rule_fired_on_an_incorrectly_decided_message_loses_accuracy() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(dir.path())?;
        store.put_rule(&rule("newsletter"))?;
        let msg = message("m1", "a@b.com", "weekly digest");
        store.upsert_message(msg.clone())?;

        let decision = Decision {
            message_id: msg.id,
            bucket: TriageBucket::AutoArchive,
            final_score: 0.2,
            confidence: 0.8,
            applied_labels: vec![],
            urgency: Urgency::Low,
            rationale: "r".to_string(),
            conflicts: vec![],
            should_escalate: false,
            follow_ups: vec![],
            decided_at: Utc::now(),
            policy_version: 1,
            rules_fired: vec!["newsletter".to_string()],
        };
        store.put_decision(&decision)?;
        store
            .record_feedback(&Feedback {
                message_id: msg.id,
                original_decision: TriageBucket::AutoArchive,
                corrected_bucket: TriageBucket::PriorityInbox,
                user_note: None,
                stamped_at: Utc::now(),
            })
            .await?;

        let outcome = run_learn_phase(&store, &LearnerConfig::default())?;
        assert_eq!(outcome.rules_scored, 1);
        let rules = store.list_rules(false)?;
        let newsletter = rules.iter().find(|r| r.id == "newsletter").unwrap();
        assert_eq!(newsletter.matches, 1);
        assert_eq!(newsletter.matches_correct, 0);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_corrections_for_one_sender_synthesize_and_promote_a_pattern() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(dir.path())?;

        for i in 0..6 {
            let msg = message(&format!("m{i}"), "boss@company.com", "update");
            store.upsert_message(msg.clone())?;
            let decision = Decision {
                message_id: msg.id,
                bucket: TriageBucket::PriorityInbox,
                final_score: 0.9,
                confidence: 0.8,
                applied_labels: vec![],
                urgency: Urgency::High,
                rationale: "r".to_string(),
                conflicts: vec![],
                should_escalate: false,
                follow_ups: vec![],
                decided_at: Utc::now(),
                policy_version: 1,
                rules_fired: vec![],
            };
            store.put_decision(&decision)?;
            store
                .record_feedback(&Feedback {
                    message_id: msg.id,
                    original_decision: TriageBucket::RegularInbox,
                    corrected_bucket: TriageBucket::PriorityInbox,
                    user_note: None,
                    stamped_at: Utc::now(),
                })
                .await?;
        }

        let outcome = run_learn_phase(&store, &LearnerConfig::default())?;
        assert!(outcome.patterns_synthesized > 0);
        assert!(outcome.rules_promoted > 0);
        assert!(store.list_patterns(None)?.iter().any(|p| p.key == "boss@company.com"));
        Ok(())
    }
}
