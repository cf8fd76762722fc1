pub(crate) mod brief;
pub(crate) mod feedback;
pub(crate) mod init;
pub(crate) mod learn;
pub(crate) mod pull;
pub(crate) mod rules;
pub(crate) mod triage;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maps a command failure onto the §6 exit-code contract: 2 for storage
/// failures, 3 for connector/LLM failures, 1 for anything else (bad
/// arguments, missing files, validation errors).
pub(crate) fn classify_exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<triage_store::StorageError>().is_some() {
        2
    } else if err.downcast_ref::<triage_connector::ConnectorError>().is_some()
        || err.downcast_ref::<triage_llm::LlmError>().is_some()
        || err.downcast_ref::<triage_scheduler::PullError>().is_some()
    {
        3
    } else {
        1
    }
}

pub(crate) fn open_store(config: &triage_config::TriageConfig) -> anyhow::Result<triage_store::Store> {
    Ok(triage_store::Store::open(&config.store.data_dir)?)
}

/// Rebuild an `IntelligenceIndex` snapshot from every persisted message.
/// Cheap enough to redo per CLI invocation; the long-running Scheduler would
/// instead call `refresh_incremental` per pull batch (§4.4).
pub(crate) fn build_index(config: &triage_config::TriageConfig, store: &triage_store::Store) -> triage_index::IntelligenceIndex {
    let index = triage_index::IntelligenceIndex::new(config.index.clone());
    let messages = store.query_messages(&Default::default(), triage_store::Pagination { offset: 0, limit: usize::MAX });
    index.rebuild_full(&messages);
    index
}

pub(crate) fn llm_client(config: &triage_config::TriageConfig) -> Option<std::sync::Arc<dyn triage_llm::LlmClient>> {
    match config.llm.provider.as_str() {
        "mock" => None,
        "ollama" | "http" => Some(std::sync::Arc::new(triage_llm::HttpLlmClient::new(&config.llm.api_key, &config.llm.model))),
        other => {
            tracing::warn!(provider = other, "unknown llm provider, falling back to no LLM");
            None
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PullCursor {
    last_pull_at: Option<DateTime<Utc>>,
}

fn cursor_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("cursor.json")
}

pub(crate) fn read_cursor(data_dir: &str) -> DateTime<Utc> {
    let path = cursor_path(data_dir);
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|raw| serde_json::from_str::<PullCursor>(&raw).ok())
        .and_then(|cursor| cursor.last_pull_at)
        .unwrap_or_else(|| DateTime::from_timestamp(0, 0).expect("epoch is a valid timestamp"))
}

pub(crate) fn write_cursor(data_dir: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
    let path = cursor_path(data_dir);
    let cursor = PullCursor { last_pull_at: Some(at) };
    std::fs::write(&path, serde_json::to_vec_pretty(&cursor)?)?;
    Ok(())
}

/// Parse a relative duration like `"2h"`, `"30m"`, `"7d"`, `"45s"` into how
/// far back from now `since` should be. No external duration-parsing crate
/// is in the teacher's workspace, so this is a minimal hand-rolled parser
/// covering the `--since` use case rather than a general one.
pub(crate) fn parse_since(raw: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(absolute) = DateTime::parse_from_rfc3339(raw) {
        return Ok(absolute.with_timezone(&Utc));
    }

    let raw = raw.trim();
    let (number, unit) = raw.split_at(raw.len().saturating_sub(1));
    let amount: i64 = number.parse().map_err(|_| anyhow::anyhow!("invalid --since value: {raw}"))?;
    let duration = match unit {
        "s" => chrono::Duration::seconds(amount),
        "m" => chrono::Duration::minutes(amount),
        "h" => chrono::Duration::hours(amount),
        "d" => chrono::Duration::days(amount),
        _ => anyhow::bail!("invalid --since unit in {raw}, expected one of s/m/h/d or an RFC3339 timestamp"),
    };
    Ok(now - duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_since_supports_relative_and_absolute_forms() {
        let now = Utc::now();
        assert_eq!(parse_since("2h", now).unwrap(), now - chrono::Duration::hours(2));
        assert!(parse_since("2024-01-01T00:00:00Z", now).unwrap().timestamp() > 0);
        assert!(parse_since("nonsense", now).is_err());
    }
}
