//! Built-in rule set (§4.2 "must ship"). Each rule ports one of the
//! Gmail-style categorizers from the original triage heuristics into the
//! condition/action shape `RulesEngine` evaluates.

use triage_store::schema::{ConditionField, ConditionOperator, EmailCategory, EmailPriority, Rule, RuleActions, RuleCondition};

pub fn all_rules() -> Vec<Rule> {
    vec![
        social_media_rule(),
        promotions_rule(),
        newsletters_rule(),
        forums_rule(),
        notifications_rule(),
        automated_emails_rule(),
        urgent_emails_rule(),
        spam_indicators_rule(),
    ]
}

fn subject_regex_rule(id: &str, name: &str, priority: i32, pattern: &str, actions: RuleActions) -> Rule {
    rule(id, name, priority, ConditionField::Subject, pattern, actions)
}

fn rule(id: &str, name: &str, priority: i32, field: ConditionField, pattern: &str, actions: RuleActions) -> Rule {
    Rule {
        id: id.to_string(),
        name: name.to_string(),
        enabled: true,
        priority,
        conditions: vec![RuleCondition {
            field,
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

pub fn social_media_rule() -> Rule {
    rule(
        "builtin_social_media",
        "Social Media",
        10,
        ConditionField::SenderDomain,
        r"(facebook|twitter|linkedin|instagram|tiktok|snapchat|discord|slack|teams)\.com$",
        RuleActions { set_category: Some(EmailCategory::Social), add_tags: vec!["social_media".to_string()], ..Default::default() },
    )
}

pub fn promotions_rule() -> Rule {
    subject_regex_rule(
        "builtin_promotions",
        "Promotions & Marketing",
        15,
        r"(sale|discount|offer|promo|deal|coupon|% off|free shipping|limited time)",
        RuleActions {
            set_category: Some(EmailCategory::Promotions),
            add_tags: vec!["promotion".to_string(), "marketing".to_string()],
            ..Default::default()
        },
    )
}

pub fn newsletters_rule() -> Rule {
    subject_regex_rule(
        "builtin_newsletters",
        "Newsletters & Updates",
        20,
        r"(newsletter|digest|weekly|monthly|update|bulletin)",
        RuleActions { set_category: Some(EmailCategory::Updates), add_tags: vec!["newsletter".to_string()], ..Default::default() },
    )
}

pub fn forums_rule() -> Rule {
    subject_regex_rule(
        "builtin_forums",
        "Forums & Communities",
        25,
        r"(\[.*\]|forum|community|discussion|replied to|mentioned you)",
        RuleActions {
            set_category: Some(EmailCategory::Forums),
            add_tags: vec!["forum".to_string(), "community".to_string()],
            ..Default::default()
        },
    )
}

pub fn notifications_rule() -> Rule {
    subject_regex_rule(
        "builtin_notifications",
        "Notifications",
        30,
        r"(notification|alert|reminder|noreply|no-reply)",
        RuleActions { set_category: Some(EmailCategory::Updates), add_tags: vec!["notification".to_string()], ..Default::default() },
    )
}

pub fn automated_emails_rule() -> Rule {
    rule(
        "builtin_automated",
        "Automated Emails",
        40,
        ConditionField::SenderAddress,
        r"(noreply|no-reply|donotreply|automated|system|daemon)@",
        RuleActions {
            set_category: Some(EmailCategory::Updates),
            set_priority: Some(EmailPriority::Low),
            add_tags: vec!["automated".to_string(), "system".to_string()],
            ..Default::default()
        },
    )
}

pub fn urgent_emails_rule() -> Rule {
    subject_regex_rule(
        "builtin_urgent",
        "Urgent Emails",
        5,
        r"(urgent|asap|emergency|critical|immediate|deadline|expires)",
        RuleActions { set_priority: Some(EmailPriority::Urgent), add_tags: vec!["urgent".to_string()], mark_flagged: Some(true), ..Default::default() },
    )
}

pub fn spam_indicators_rule() -> Rule {
    subject_regex_rule(
        "builtin_spam_indicators",
        "Spam Indicators",
        50,
        r"(RE: RE: RE:|FW: FW: FW:|WINNER|CONGRATULATIONS|CLAIM YOUR|ACT NOW|CASH PRIZE)",
        RuleActions { add_tags: vec!["potential_spam".to_string()], set_priority: Some(EmailPriority::Low), ..Default::default() },
    )
}

/// Create a custom domain-based rule, e.g. for editing a strategic VIP
/// domain into the always-Primary category from the CLI (§11).
pub fn domain_rule(domain: &str, category: EmailCategory, tags: Vec<String>) -> Rule {
    let id = format!("domain_{}", domain.replace('.', "_"));
    let tags = if tags.is_empty() { vec![domain.split('.').next().unwrap_or(domain).to_string()] } else { tags };
    Rule {
        id,
        name: format!("Domain: {domain}"),
        enabled: true,
        priority: 100,
        conditions: vec![RuleCondition {
            field: ConditionField::SenderDomain,
            operator: ConditionOperator::Equals,
            value: domain.to_string(),
            case_sensitive: false,
        }],
        actions: RuleActions { set_category: Some(category), add_tags: tags, ..Default::default() },
        compile_error: None,
        matches: 0,
        matches_correct: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rules_have_unique_ids_and_valid_regexes() {
        let rules = all_rules();
        let mut ids = std::collections::HashSet::new();
        for rule in &rules {
            assert!(ids.insert(rule.id.clone()), "duplicate rule id {}", rule.id);
            for condition in &rule.conditions {
                assert!(regex::Regex::new(&condition.value).is_ok(), "bad regex in {}", rule.id);
            }
        }
    }

    #[test]
    fn urgent_rule_has_highest_priority_among_builtins() {
        let rules = all_rules();
        let urgent = rules.iter().find(|r| r.id == "builtin_urgent").unwrap();
        assert!(rules.iter().all(|r| r.priority >= urgent.priority));
    }
}
