use anyhow::{Context, Result};
use triage_config::TriageConfig;
use triage_store::schema::{Message, Rule};

use super::open_store;
use crate::RulesCommands;

pub(crate) async fn run(config: &TriageConfig, command: RulesCommands) -> Result<()> {
    let store = open_store(config)?;
    match command {
        RulesCommands::List => list(&store),
        RulesCommands::Add { file } => add(&store, &file),
        RulesCommands::Remove { id } => remove(&store, &id),
        RulesCommands::Test { id, against } => test(&store, &id, &against),
    }
}

fn list(store: &triage_store::Store) -> Result<()> {
    let rules = store.list_rules(false)?;
    if rules.is_empty() {
        println!("no rules defined");
        return Ok(());
    }
    for rule in rules {
        let accuracy = rule.accuracy().map(|a| format!("{:.0}%", a * 100.0)).unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:<24} priority={:<4} enabled={:<5} matches={:<6} accuracy={}{}",
            rule.id,
            rule.priority,
            rule.enabled,
            rule.matches,
            accuracy,
            rule.compile_error.as_ref().map(|e| format!("  (compile error: {e})")).unwrap_or_default(),
        );
    }
    Ok(())
}

fn add(store: &triage_store::Store, file: &std::path::Path) -> Result<()> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("reading rule file {}", file.display()))?;
    let mut rule: Rule = serde_json::from_str(&raw).with_context(|| format!("parsing rule file {}", file.display()))?;
    triage_rules::validate_rule(&mut rule);
    store.put_rule(&rule)?;
    println!("added rule {}{}", rule.id, rule.compile_error.as_ref().map(|e| format!(" (compile error: {e})")).unwrap_or_default());
    Ok(())
}

fn remove(store: &triage_store::Store, id: &str) -> Result<()> {
    if store.delete_rule(id)? {
        println!("removed rule {id}");
    } else {
        anyhow::bail!("no such rule: {id}");
    }
    Ok(())
}

fn test(store: &triage_store::Store, id: &str, against: &std::path::Path) -> Result<()> {
    let rule = store.list_rules(false)?.into_iter().find(|r| r.id == id).ok_or_else(|| anyhow::anyhow!("no such rule: {id}"))?;
    let raw = std::fs::read_to_string(against).with_context(|| format!("reading sample message {}", against.display()))?;
    let message: Message = serde_json::from_str(&raw).with_context(|| format!("parsing sample message {}", against.display()))?;

    let report = triage_rules::test_rule(&rule, &message);
    println!("rule {} {}", report.rule_id, if report.matched { "MATCHES" } else { "does not match" });
    for condition in &report.conditions {
        println!(
            "  {:?} {:?} {:?} -> {}",
            condition.field,
            condition.operator,
            condition.value,
            if condition.matched { "matched" } else { "failed" },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_store::Store;
    use triage_store::schema::{ConditionField, ConditionOperator, RuleActions, RuleCondition};

    fn sample_rule() -> Rule {
        Rule {
            id: "promo".to_string(),
            name: "promo".to_string(),
            enabled: true,
            priority: 10,
            conditions: vec![RuleCondition {
                field: ConditionField::Subject,
                operator: ConditionOperator::Contains,
                value: "% off".to_string(),
                case_sensitive: false,
            }],
            actions: RuleActions::default(),
            compile_error: None,
            matches: 0,
            matches_correct: 0,
        }
    }

    #[test]
    fn add_then_remove_round_trips_through_the_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(dir.path())?;
        store.put_rule(&sample_rule())?;
        assert_eq!(store.list_rules(false)?.len(), 1);
        assert!(store.delete_rule("promo")?);
        assert_eq!(store.list_rules(false)?.len(), 0);
        Ok(())
    }
}
