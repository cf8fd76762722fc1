use std::collections::HashMap;

use regex::Regex;
use tracing::warn;
use triage_store::schema::{ConditionField, ConditionOperator, EmailCategory, EmailPriority, Message, Rule};

/// Ordered list of rule IDs that fired during one `apply` call, in firing order.
pub type EvaluationOutcome = Vec<String>;

struct CompiledRule<'a> {
    rule: &'a Rule,
    regexes: HashMap<usize, Regex>,
}

/// Stateless evaluator: compiles condition regexes per call rather than
/// caching across calls, since `Rule`s are typically reloaded from Store
/// between scheduler cycles (§4.2: "regex compiles once per rule" refers to
/// one evaluation pass over the message, not process lifetime).
#[derive(Debug, Default)]
pub struct RulesEngine;

impl RulesEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply `rules` (already filtered/sorted by the caller, typically via
    /// `Store::list_rules(true)`) to `message` in order, mutating it in place.
    /// Returns the ordered list of rule IDs that fired, for audit.
    pub fn apply(&self, message: &mut Message, rules: &[Rule]) -> EvaluationOutcome {
        let mut fired = Vec::new();

        for rule in rules {
            if !rule.enabled || rule.compile_error.is_some() {
                continue;
            }

            let compiled = compile_rule(rule);
            if compiled.regexes.len() != regex_condition_count(rule) {
                // At least one regex failed to compile mid-pass; treat as
                // non-match rather than aborting the whole engine run.
                warn!(rule_id = %rule.id, "rule has an uncompilable regex condition; skipping");
                continue;
            }

            if evaluate_conditions(message, &compiled) {
                apply_actions(message, &rule.actions);
                fired.push(rule.id.clone());
            }
        }

        fired
    }
}

fn regex_condition_count(rule: &Rule) -> usize {
    rule.conditions
        .iter()
        .filter(|c| c.operator == ConditionOperator::Regex)
        .count()
}

fn compile_rule(rule: &Rule) -> CompiledRule<'_> {
    let mut regexes = HashMap::new();
    for (idx, condition) in rule.conditions.iter().enumerate() {
        if condition.operator != ConditionOperator::Regex {
            continue;
        }
        let pattern = if condition.case_sensitive {
            condition.value.clone()
        } else {
            format!("(?i){}", condition.value)
        };
        match Regex::new(&pattern) {
            Ok(re) => {
                regexes.insert(idx, re);
            }
            Err(err) => {
                warn!(rule_id = %rule.id, error = %err, "failed to compile rule regex");
            }
        }
    }
    CompiledRule { rule, regexes }
}

fn evaluate_conditions(message: &Message, compiled: &CompiledRule<'_>) -> bool {
    compiled
        .rule
        .conditions
        .iter()
        .enumerate()
        .all(|(idx, condition)| evaluate_condition(message, condition, compiled.regexes.get(&idx)))
}

fn evaluate_condition(message: &Message, condition: &triage_store::schema::RuleCondition, regex: Option<&Regex>) -> bool {
    use ConditionOperator::*;

    if condition.operator == Regex {
        return regex.map(|re| re.is_match(field_text(message, condition.field).as_deref().unwrap_or(""))).unwrap_or(false);
    }

    let field_value = match field_text(message, condition.field) {
        Some(v) => v,
        None => return false,
    };

    let (haystack, needle) = if condition.case_sensitive {
        (field_value, condition.value.clone())
    } else {
        (field_value.to_lowercase(), condition.value.to_lowercase())
    };

    match condition.operator {
        Equals => haystack == needle,
        NotEquals => haystack != needle,
        Contains => haystack.contains(&needle),
        NotContains => !haystack.contains(&needle),
        StartsWith => haystack.starts_with(&needle),
        EndsWith => haystack.ends_with(&needle),
        Regex => unreachable!("handled above"),
    }
}

/// Text form of a condition's selected field. Fields with no natural string
/// form (e.g. `HasAttachments`) render as `"true"`/`"false"`; an unknown
/// field/operator combination is handled by the caller returning `false`.
fn field_text(message: &Message, field: ConditionField) -> Option<String> {
    use ConditionField::*;
    Some(match field {
        Subject => message.subject.clone(),
        SenderAddress => message.sender.address.clone(),
        SenderDomain => message.sender_domain().to_string(),
        BodyText => message.body_text.clone(),
        HasAttachments => message.has_attachments.to_string(),
        AttachmentCount => message.attachment_count.to_string(),
        Recipients => message.recipients.join(", "),
        Category => format!("{:?}", message.category),
        Priority => format!("{:?}", message.priority),
        Tags => message.tags.iter().cloned().collect::<Vec<_>>().join(", "),
    })
}

fn apply_actions(message: &mut Message, actions: &triage_store::schema::RuleActions) {
    if let Some(category) = actions.set_category {
        message.category = category;
        message.category_inferred = false;
    }
    if let Some(priority) = actions.set_priority {
        message.priority = priority;
    }
    for tag in &actions.add_tags {
        message.tags.insert(tag.clone());
    }
    for tag in &actions.remove_tags {
        message.tags.remove(tag);
    }
    if let Some(read) = actions.mark_read {
        message.is_read = read;
    }
    if let Some(flagged) = actions.mark_flagged {
        message.is_flagged = flagged;
    }
}

/// Per-condition result of [`test_rule`] (§11 SUPPLEMENT: `rules test`
/// dry-run, grounded in `advanced_engine.py`'s condition-level tracing).
#[derive(Debug, Clone)]
pub struct ConditionResult {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: String,
    pub matched: bool,
}

#[derive(Debug, Clone)]
pub struct RuleTestReport {
    pub rule_id: String,
    pub conditions: Vec<ConditionResult>,
    pub matched: bool,
}

/// Evaluate `rule` against `message` without mutating it, reporting which
/// individual conditions matched. Used by `triage rules test`.
pub fn test_rule(rule: &Rule, message: &Message) -> RuleTestReport {
    let compiled = compile_rule(rule);
    let conditions: Vec<ConditionResult> = rule
        .conditions
        .iter()
        .enumerate()
        .map(|(idx, condition)| ConditionResult {
            field: condition.field,
            operator: condition.operator,
            value: condition.value.clone(),
            matched: evaluate_condition(message, condition, compiled.regexes.get(&idx)),
        })
        .collect();
    let matched = !conditions.is_empty() && conditions.iter().all(|c| c.matched);
    RuleTestReport { rule_id: rule.id.clone(), conditions, matched }
}

/// Sanity check a rule's regex conditions, populating `compile_error` if any
/// fail. Called by Store/CLI on `PutRule` so a bad rule never silently runs.
pub fn validate_rule(rule: &mut Rule) {
    for condition in &rule.conditions {
        if condition.operator != ConditionOperator::Regex {
            continue;
        }
        if let Err(err) = Regex::new(&condition.value) {
            rule.compile_error = Some(err.to_string());
            return;
        }
    }
    rule.compile_error = None;
}

#[allow(dead_code)]
fn category_or_default(category: Option<EmailCategory>) -> EmailCategory {
    category.unwrap_or_default()
}

#[allow(dead_code)]
fn priority_or_default(priority: Option<EmailPriority>) -> EmailPriority {
    priority.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use triage_store::schema::{RuleActions, RuleCondition, SenderAddress};
    use uuid::Uuid;

    fn message(subject: &str, sender: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            external_id: "ext".to_string(),
            thread_id: "t".to_string(),
            sender: SenderAddress { address: sender.to_string(), display_name: None },
            recipients: vec![],
            subject: subject.to_string(),
            body_text: String::new(),
            body_html: None,
            sent_at: Utc::now(),
            received_at: Utc::now(),
            is_read: false,
            is_flagged: false,
            category: EmailCategory::Primary,
            priority: EmailPriority::Normal,
            tags: HashSet::new(),
            provider_labels: HashSet::new(),
            processing_stamps: HashSet::new(),
            has_attachments: false,
            attachment_count: 0,
            category_inferred: true,
        }
    }

    fn regex_rule(id: &str, priority: i32, pattern: &str, actions: RuleActions) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            enabled: true,
            priority,
            conditions: vec![RuleCondition {
                field: ConditionField::Subject,
                operator: ConditionOperator::Regex,
                value: pattern.to_string(),
                case_sensitive: false,
            }],
            actions,
            compile_error: None,
            matches: 0,
            matches_correct: 0,
        }
    }

    #[test]
    fn matching_rule_applies_actions_and_is_reported_fired() {
        let engine = RulesEngine::new();
        let mut msg = message("Weekly Newsletter", "news@example.com");
        let rule = regex_rule(
            "builtin_newsletters",
            20,
            "(newsletter|digest)",
            RuleActions { set_category: Some(EmailCategory::Updates), add_tags: vec!["newsletter".into()], ..Default::default() },
        );

        let fired = engine.apply(&mut msg, std::slice::from_ref(&rule));
        assert_eq!(fired, vec!["builtin_newsletters".to_string()]);
        assert_eq!(msg.category, EmailCategory::Updates);
        assert!(msg.tags.contains("newsletter"));
    }

    #[test]
    fn disabled_rule_never_fires() {
        let engine = RulesEngine::new();
        let mut msg = message("urgent: respond now", "a@b.com");
        let mut rule = regex_rule("urgent", 5, "urgent", RuleActions { mark_flagged: Some(true), ..Default::default() });
        rule.enabled = false;

        let fired = engine.apply(&mut msg, std::slice::from_ref(&rule));
        assert!(fired.is_empty());
        assert!(!msg.is_flagged);
    }

    #[test]
    fn rule_with_compile_error_is_skipped_not_fatal() {
        let engine = RulesEngine::new();
        let mut msg = message("anything", "a@b.com");
        let mut rule = regex_rule("bad", 1, "(", RuleActions::default());
        rule.compile_error = Some("unterminated group".to_string());

        let fired = engine.apply(&mut msg, std::slice::from_ref(&rule));
        assert!(fired.is_empty());
    }

    #[test]
    fn rules_apply_in_ascending_priority_order() {
        let engine = RulesEngine::new();
        let mut msg = message("urgent newsletter", "a@b.com");
        let urgent = regex_rule("urgent", 5, "urgent", RuleActions { set_priority: Some(EmailPriority::Urgent), ..Default::default() });
        let newsletter = regex_rule("newsletter", 20, "newsletter", RuleActions { set_priority: Some(EmailPriority::Low), ..Default::default() });

        // newsletter (priority 20) runs after urgent (priority 5), so its
        // setPriority should win if both fire against the same field.
        let fired = engine.apply(&mut msg, &[urgent, newsletter]);
        assert_eq!(fired, vec!["urgent".to_string(), "newsletter".to_string()]);
        assert_eq!(msg.priority, EmailPriority::Low);
    }

    #[test]
    fn validate_rule_sets_compile_error_on_bad_regex() {
        let mut rule = regex_rule("bad", 1, "(", RuleActions::default());
        rule.compile_error = None;
        validate_rule(&mut rule);
        assert!(rule.compile_error.is_some());
    }

    #[test]
    fn validate_rule_clears_compile_error_on_good_regex() {
        let mut rule = regex_rule("good", 1, "ok", RuleActions::default());
        rule.compile_error = Some("stale".to_string());
        validate_rule(&mut rule);
        assert!(rule.compile_error.is_none());
    }

    #[test]
    fn test_rule_reports_per_condition_matches_without_mutating() {
        let rule = regex_rule("newsletter", 20, "(newsletter|digest)", RuleActions { set_priority: Some(EmailPriority::Low), ..Default::default() });
        let msg = message("Weekly Newsletter", "news@example.com");
        let report = test_rule(&rule, &msg);
        assert!(report.matched);
        assert_eq!(report.conditions.len(), 1);
        assert!(report.conditions[0].matched);
        assert_eq!(msg.priority, EmailPriority::Normal);
    }
}
