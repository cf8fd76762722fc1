//! Pull phase (§4.7): invoke the Connector, persist via Store, advance the
//! high-water mark only after a successful persist.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use triage_connector::{Connector, ConnectorError};
use triage_store::Store;

use crate::backoff::Backoff;

#[derive(Debug, thiserror::Error)]
pub enum PullError {
    #[error("connector auth failed: {0}")]
    Auth(String),
    #[error(transparent)]
    Storage(#[from] triage_store::StorageError),
    #[error("connector rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

pub struct PullOutcome {
    pub pulled: usize,
    pub next_since: DateTime<Utc>,
}

/// Run one pull cycle. On a transient/rate-limit error, the caller's
/// high-water mark is left unchanged (§5) — we simply return the error and
/// the cursor that was passed in.
#[instrument(skip(connector, store))]
pub async fn run_pull_phase(
    connector: &dyn Connector,
    store: &Store,
    since: DateTime<Utc>,
    max: usize,
) -> Result<PullOutcome, PullError> {
    connector.authenticate().await.map_err(|e| PullError::Auth(e.to_string()))?;

    let result = match connector.pull(since, max).await {
        Ok(r) => r,
        Err(ConnectorError::RateLimited { retry_after_secs }) => {
            warn!(retry_after_secs, "pull phase: connector rate limited, keeping high-water mark");
            return Err(PullError::RateLimited { retry_after_secs });
        }
        Err(ConnectorError::Transient(msg)) => {
            warn!(error = %msg, "pull phase: transient connector error, keeping high-water mark");
            return Err(PullError::RateLimited { retry_after_secs: 0 });
        }
        Err(other) => return Err(PullError::Auth(other.to_string())),
    };

    let pulled = result.messages.len();
    for message in result.messages {
        store.upsert_message(message)?;
    }

    info!(pulled, next_since = %result.next_since, "pull phase complete");
    Ok(PullOutcome { pulled, next_since: result.next_since })
}

/// Drive the backoff policy for a rate-limited pull: sleep, then let the
/// caller retry with the same `since`.
pub async fn wait_out_rate_limit(backoff: &mut Backoff) {
    let delay = backoff.advance();
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_connector::mock::MockConnector;

    #[tokio::test]
    async fn successful_pull_advances_cursor_and_persists_messages() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(dir.path())?;
        let connector = MockConnector::new(Vec::new());
        let now = Utc::now();
        connector.seed(sample_message("m1", now));

        let since = now - chrono::Duration::days(1);
        let outcome = run_pull_phase(&connector, &store, since, 100).await?;
        assert_eq!(outcome.pulled, 1);
        assert!(outcome.next_since >= now);

        let all = store.query_messages(&Default::default(), Default::default());
        assert_eq!(all.len(), 1);
        Ok(())
    }

    fn sample_message(external_id: &str, at: DateTime<Utc>) -> triage_store::schema::Message {
        use std::collections::HashSet;
        use triage_store::schema::{EmailCategory, EmailPriority, SenderAddress};
        triage_store::schema::Message {
            id: uuid::Uuid::new_v4(),
            external_id: external_id.to_string(),
            thread_id: "t1".to_string(),
            sender: SenderAddress { address: "a@b.com".to_string(), display_name: None },
            recipients: vec!["me@example.com".to_string()],
            subject: "hi".to_string(),
            body_text: "body".to_string(),
            body_html: None,
            sent_at: at,
            received_at: at,
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
}
