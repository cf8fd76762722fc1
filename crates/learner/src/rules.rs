//! Rule performance tracking (§4.6): suggestions derived from the
//! `matches`/`matches_correct` counters already carried on each `Rule`.

use triage_config::LearnerConfig;
use triage_store::schema::Rule;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleSuggestion {
    Disable { rule_id: String, accuracy: f32 },
    Enable { rule_id: String, accuracy: f32 },
}

/// Record that `rule` fired and whether its predicted attribute matched the
/// final Decision, updating its rolling accuracy counters in place.
pub fn record_rule_match(rule: &mut Rule, predicted_correct: bool) {
    rule.matches += 1;
    if predicted_correct {
        rule.matches_correct += 1;
    }
}

/// Suggest disabling rules with poor accuracy over enough samples, and
/// re-enabling disabled rules that historically performed well (§4.6).
pub fn suggestions(rules: &[Rule], config: &LearnerConfig) -> Vec<RuleSuggestion> {
    rules
        .iter()
        .filter_map(|rule| {
            let accuracy = rule.accuracy()?;
            if rule.enabled && accuracy < config.rule_disable_accuracy && rule.matches >= config.rule_disable_min_matches as u64 {
                Some(RuleSuggestion::Disable { rule_id: rule.id.clone(), accuracy })
            } else if !rule.enabled && accuracy > config.rule_enable_accuracy {
                Some(RuleSuggestion::Enable { rule_id: rule.id.clone(), accuracy })
            } else {
                None
            }
        })
        .collect()
}
