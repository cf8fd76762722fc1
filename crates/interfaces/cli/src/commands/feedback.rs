use anyhow::{Context, Result};
use chrono::{Timelike, Utc};
use triage_config::TriageConfig;
use triage_learner::FeedbackLearner;
use triage_store::schema::{Feedback, TriageBucket};

use super::open_store;

/// `triage feedback --message-id ID --corrected BUCKET [--note TEXT]`:
/// record a correction (§4.1 RecordFeedback), then load the persisted
/// learner state, apply the immediate sender-weight/keyword adjustment
/// (§4.6), and save it back so the next `triage triage` run consumes it.
pub(crate) async fn run_feedback(config: &TriageConfig, message_id: String, corrected: String, note: Option<String>) -> Result<()> {
    let store = open_store(config)?;
    let message_id = message_id.parse().context("--message-id must be a UUID")?;
    let corrected_bucket = parse_bucket(&corrected)?;

    let decision = store.get_decision(&message_id)?.ok_or_else(|| anyhow::anyhow!("no decision found for message {message_id}"))?;
    let message = store
        .query_messages(&Default::default(), triage_store::Pagination { offset: 0, limit: usize::MAX })
        .into_iter()
        .find(|m| m.id == message_id)
        .ok_or_else(|| anyhow::anyhow!("no stored message {message_id}"))?;

    let feedback = Feedback {
        message_id,
        original_decision: decision.bucket,
        corrected_bucket,
        user_note: note,
        stamped_at: Utc::now(),
    };
    store.record_feedback(&feedback).await?;

    let mut learner = FeedbackLearner::from_weights(config.learner.clone(), store.get_learner_weights()?);
    let decided_hour = decision.decided_at.hour();
    learner.apply_feedback(corrected_bucket, &message, decided_hour);
    store.put_learner_weights(&learner.weights())?;

    println!(
        "recorded feedback: {:?} -> {:?} for {} (sender weight now {:.2})",
        feedback.original_decision,
        feedback.corrected_bucket,
        message.sender.address,
        learner.sender_weight(&message.sender.address),
    );
    Ok(())
}

fn parse_bucket(raw: &str) -> Result<TriageBucket> {
    match raw.to_uppercase().replace('-', "_").as_str() {
        "PRIORITY_INBOX" | "PRIORITY" => Ok(TriageBucket::PriorityInbox),
        "REGULAR_INBOX" | "REGULAR" => Ok(TriageBucket::RegularInbox),
        "AUTO_ARCHIVE" | "ARCHIVE" => Ok(TriageBucket::AutoArchive),
        "SPAM_FOLDER" | "SPAM" => Ok(TriageBucket::SpamFolder),
        other => anyhow::bail!("unknown bucket: {other} (expected PRIORITY_INBOX, REGULAR_INBOX, AUTO_ARCHIVE, or SPAM_FOLDER)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bucket_accepts_both_enum_and_short_forms() {
        assert_eq!(parse_bucket("PRIORITY_INBOX").unwrap(), TriageBucket::PriorityInbox);
        assert_eq!(parse_bucket("spam").unwrap(), TriageBucket::SpamFolder);
        assert!(parse_bucket("nonsense").is_err());
    }
}
