use anyhow::Result;
use triage_config::TriageConfig;

use super::open_store;

/// `triage learn`: score rule accuracy against the feedback log, synthesize
/// patterns, and promote confident ones to rules (§4.6). Intended to run
/// periodically alongside `triage triage`, not on every invocation.
pub(crate) async fn run_learn(config: &TriageConfig) -> Result<()> {
    let store = open_store(config)?;
    let outcome = triage_scheduler::run_learn_phase(&store, &config.learner)?;

    println!(
        "scored {} rule firing(s), synthesized {} pattern(s), promoted {} rule(s)",
        outcome.rules_scored, outcome.patterns_synthesized, outcome.rules_promoted
    );
    for suggestion in &outcome.suggestions {
        match suggestion {
            triage_learner::rules::RuleSuggestion::Disable { rule_id, accuracy } => {
                println!("  suggest disabling {rule_id} (accuracy {:.0}%)", accuracy * 100.0)
            }
            triage_learner::rules::RuleSuggestion::Enable { rule_id, accuracy } => {
                println!("  suggest enabling {rule_id} (accuracy {:.0}%)", accuracy * 100.0)
            }
        }
    }
    Ok(())
}
