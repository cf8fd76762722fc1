use std::time::Duration;

use anyhow::Result;
use triage_collaborator::Collaborator;
use triage_config::TriageConfig;
use triage_rules::RulesEngine;

use super::{build_index, llm_client, open_store};

/// `triage triage [--limit N] [--dry-run]`: one analyze pass (§4.7). With
/// `--dry-run`, decisions are computed and printed but never persisted.
pub(crate) async fn run_triage(config: &TriageConfig, limit: Option<usize>, dry_run: bool) -> Result<()> {
    let store = open_store(config)?;
    let index = build_index(config, &store);
    let rules_engine = RulesEngine::new();
    let collaborator = Collaborator::new(config.collaborator.clone());
    let llm = llm_client(config);
    let learner_weights = store.get_learner_weights()?;

    let phase = triage_scheduler::AnalyzePhase {
        store: &store,
        index: &index,
        rules_engine: &rules_engine,
        collaborator: &collaborator,
        llm,
        llm_timeout: Duration::from_secs(config.scheduler.llm_timeout_secs),
        llm_backoff: Duration::from_millis(500),
        worker_count: if config.scheduler.analyzer_workers == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            config.scheduler.analyzer_workers
        },
        policy_version: 1,
        learner_weights,
    };

    let limit = limit.unwrap_or(usize::MAX);
    let decided = triage_scheduler::run_analyze_phase(&phase, limit, !dry_run).await?;

    println!("{} message(s) {}", decided.len(), if dry_run { "would be decided (dry run)" } else { "decided" });
    for (message, decision) in &decided {
        println!(
            "  {} [{}] -> {:?} (score {:.2}, confidence {:.2}){}",
            message.external_id,
            message.subject,
            decision.bucket,
            decision.final_score,
            decision.confidence,
            if decision.should_escalate { " ESCALATE" } else { "" },
        );
    }
    Ok(())
}
