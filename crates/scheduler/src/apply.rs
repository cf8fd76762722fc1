//! Apply phase (§4.7): push label additions and archive/read state back to
//! the Connector for every Decision lacking `labelsPushed`. Serialized per
//! Connector to respect provider rate limits (§5).

use tracing::{info, instrument, warn};
use triage_connector::Connector;
use triage_store::schema::{ProcessingStamp, TriageBucket};
use triage_store::Store;

#[instrument(skip(connector, store))]
pub async fn run_apply_phase(connector: &dyn Connector, store: &Store, limit: usize) -> Result<usize, triage_store::StorageError> {
    let pending: Vec<_> = store
        .query_messages(&Default::default(), triage_store::Pagination { offset: 0, limit: usize::MAX })
        .into_iter()
        .filter(|m| m.has_stamp(ProcessingStamp::Decided) && !m.has_stamp(ProcessingStamp::LabelsPushed))
        .take(limit)
        .collect();

    let mut pushed = 0;
    for mut message in pending {
        let Some(decision) = store.get_decision(&message.id)? else {
            continue;
        };

        let push_result = apply_decision(connector, &message.external_id, &decision).await;
        match push_result {
            Ok(()) => {
                message.stamp(ProcessingStamp::LabelsPushed);
                store.upsert_message(message)?;
                pushed += 1;
            }
            Err(err) => {
                warn!(external_id = %message.external_id, error = %err, "apply phase: push failed, leaving pending");
            }
        }
    }

    info!(pushed, "apply phase complete");
    Ok(pushed)
}

async fn apply_decision(
    connector: &dyn Connector,
    external_id: &str,
    decision: &triage_store::schema::Decision,
) -> Result<(), triage_connector::ConnectorError> {
    if !decision.applied_labels.is_empty() {
        connector.apply_labels(external_id, &decision.applied_labels, &[]).await?;
    }

    match decision.bucket {
        TriageBucket::AutoArchive | TriageBucket::SpamFolder => {
            connector.archive(external_id).await?;
        }
        TriageBucket::PriorityInbox => {
            connector.mark_read(external_id, false).await?;
        }
        TriageBucket::RegularInbox => {}
    }

    Ok(())
}
