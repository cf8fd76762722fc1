use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use triage_config::TriageConfig;
use triage_store::MessageFilter;

use super::{llm_client, open_store};

/// `triage brief [--date YYYY-MM-DD]`: generate and persist the narrative
/// brief for a day (§4.8), defaulting to today.
pub(crate) async fn run_brief(config: &TriageConfig, date: Option<String>) -> Result<()> {
    let store = open_store(config)?;
    let date = match date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| anyhow::anyhow!("invalid --date, expected YYYY-MM-DD"))?,
        None => chrono::Utc::now().date_naive(),
    };

    let window_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let window_end = date.and_hms_opt(23, 59, 59).unwrap().and_utc();
    let filter = MessageFilter { since: Some(window_start), until: Some(window_end), ..Default::default() };
    let messages = store.query_messages(&filter, triage_store::Pagination { offset: 0, limit: usize::MAX });

    let llm = llm_client(config);
    let brief = triage_scheduler::generate_brief(
        date,
        &messages,
        llm.as_deref(),
        Duration::from_secs(config.scheduler.llm_timeout_secs),
        Duration::from_millis(500),
    )
    .await;

    store.put_brief(&brief)?;

    println!("{}", brief.headline);
    println!("{}", brief.narrative);
    if !brief.action_items.is_empty() {
        println!("action items:");
        for item in &brief.action_items {
            println!("  - {item}");
        }
    }
    Ok(())
}
