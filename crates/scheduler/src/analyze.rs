//! Analyze phase (§4.7): for each message lacking the `analyzed` stamp, run
//! Rules, then the five analyzers in parallel, then the Collaborator, then
//! persist the Decision and stamp the stages. Concurrency is bounded by a
//! worker pool (§5 "a pool of analyzer workers").

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};
use triage_analyzers::AnalyzerContext;
use triage_collaborator::Collaborator;
use triage_index::IntelligenceIndex;
use triage_llm::LlmClient;
use triage_rules::RulesEngine;
use triage_store::schema::{LearnerWeights, ProcessingStamp};
use triage_store::Store;

pub struct AnalyzePhase<'a> {
    pub store: &'a Store,
    pub index: &'a IntelligenceIndex,
    pub rules_engine: &'a RulesEngine,
    pub collaborator: &'a Collaborator,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub llm_timeout: std::time::Duration,
    pub llm_backoff: std::time::Duration,
    pub worker_count: usize,
    pub policy_version: u32,
    pub learner_weights: LearnerWeights,
}

/// Run one analyze pass over every persisted message not yet stamped
/// `Analyzed`. Returns the decided `(Message, Decision)` pairs; when
/// `persist` is true they're also written back to the Store (the `--dry-run`
/// CLI flag sets this false to preview without committing).
#[instrument(skip(phase))]
pub async fn run_analyze_phase(
    phase: &AnalyzePhase<'_>,
    limit: usize,
    persist: bool,
) -> Result<Vec<(triage_store::schema::Message, triage_store::schema::Decision)>, triage_store::StorageError> {
    let rules = phase.store.list_rules(true)?;

    let pending: Vec<_> = phase
        .store
        .query_messages(&Default::default(), triage_store::Pagination { offset: 0, limit: usize::MAX })
        .into_iter()
        .filter(|m| !m.has_stamp(ProcessingStamp::Analyzed))
        .take(limit)
        .collect();

    let worker_count = phase.worker_count.max(1);
    let results: Vec<_> = stream::iter(pending.into_iter())
        .map(|mut message| {
            let rules = &rules;
            async move {
                let fired = phase.rules_engine.apply(&mut message, rules);
                if !fired.is_empty() {
                    info!(external_id = %message.external_id, rules = ?fired, "analyze phase: rules applied");
                }
                message.stamp(ProcessingStamp::RulesApplied);

                let ctx = AnalyzerContext {
                    llm: phase.llm.as_deref(),
                    llm_timeout: phase.llm_timeout,
                    llm_backoff: phase.llm_backoff,
                    learner_weights: Some(&phase.learner_weights),
                };
                let assessments = triage_analyzers::run_all(&message, phase.index, &ctx).await;
                message.stamp(ProcessingStamp::Analyzed);

                let mut decision =
                    phase.collaborator.decide(message.id, message.category, &assessments, &message.body_text, phase.policy_version);
                decision.rules_fired = fired;
                message.stamp(ProcessingStamp::Decided);

                (message, decision)
            }
        })
        .buffer_unordered(worker_count)
        .collect()
        .await;

    if persist {
        for (message, decision) in &results {
            phase.store.put_decision(decision)?;
            if let Err(err) = phase.store.upsert_message(message.clone()) {
                warn!(error = %err, "analyze phase: failed to persist processing stamps");
            }
        }
    }

    info!(decided = results.len(), persist, "analyze phase complete");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use triage_store::schema::{EmailCategory, EmailPriority, SenderAddress};

    use super::*;

    fn sample_message(external_id: &str) -> triage_store::schema::Message {
        let now = chrono::Utc::now();
        triage_store::schema::Message {
            id: uuid::Uuid::new_v4(),
            external_id: external_id.to_string(),
            thread_id: "t1".to_string(),
            sender: SenderAddress { address: "a@b.com".to_string(), display_name: None },
            recipients: vec!["me@example.com".to_string()],
            subject: "please review".to_string(),
            body_text: "please take a look when you can".to_string(),
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

    fn phase<'a>(
        store: &'a Store,
        index: &'a IntelligenceIndex,
        rules_engine: &'a RulesEngine,
        collaborator: &'a Collaborator,
    ) -> AnalyzePhase<'a> {
        AnalyzePhase {
            store,
            index,
            rules_engine,
            collaborator,
            llm: None,
            llm_timeout: std::time::Duration::from_secs(1),
            llm_backoff: std::time::Duration::from_millis(10),
            worker_count: 2,
            policy_version: 1,
            learner_weights: LearnerWeights::default(),
        }
    }

    #[tokio::test]
    async fn dry_run_decides_without_persisting() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(dir.path())?;
        store.upsert_message(sample_message("m1"))?;

        let index = IntelligenceIndex::new(Default::default());
        let rules_engine = RulesEngine::new();
        let collaborator = Collaborator::new(Default::default());
        let phase = phase(&store, &index, &rules_engine, &collaborator);

        let results = run_analyze_phase(&phase, usize::MAX, false).await?;
        assert_eq!(results.len(), 1);
        assert!(store.get_decision(&results[0].0.id)?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn persisted_run_writes_decision_and_stamps_message() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(dir.path())?;
        store.upsert_message(sample_message("m1"))?;

        let index = IntelligenceIndex::new(Default::default());
        let rules_engine = RulesEngine::new();
        let collaborator = Collaborator::new(Default::default());
        let phase = phase(&store, &index, &rules_engine, &collaborator);

        let results = run_analyze_phase(&phase, usize::MAX, true).await?;
        assert_eq!(results.len(), 1);
        let message_id = results[0].0.id;
        assert!(store.get_decision(&message_id)?.is_some());

        let second_pass = run_analyze_phase(&phase, usize::MAX, true).await?;
        assert!(second_pass.is_empty(), "already-analyzed messages should not be re-decided");
        Ok(())
    }
}
