use anyhow::Result;
use chrono::Utc;
use triage_config::TriageConfig;
use triage_connector::mock::MockConnector;

use super::{open_store, read_cursor, write_cursor};

/// `triage pull [--since DURATION] [--max N]`: run one pull phase against
/// the configured connector. Only the in-memory mock connector ships (§9
/// design notes: real provider adapters are out of this crate's scope), so
/// this is primarily useful once a provider-specific `Connector` impl is
/// wired in at `llm_client`'s call site.
pub(crate) async fn run_pull(config: &TriageConfig, since: Option<String>, max: Option<usize>) -> Result<()> {
    let store = open_store(config)?;
    let now = Utc::now();
    let since = match since {
        Some(raw) => super::parse_since(&raw, now)?,
        None => read_cursor(&config.store.data_dir),
    };
    let max = max.unwrap_or(config.scheduler.pull_batch_size);

    let connector = MockConnector::new(Vec::new());
    let outcome = triage_scheduler::run_pull_phase(&connector, &store, since, max).await?;

    write_cursor(&config.store.data_dir, outcome.next_since)?;
    println!("pulled {} message(s), cursor advanced to {}", outcome.pulled, outcome.next_since);
    Ok(())
}
