//! `Store`: durable persistence layer (§4.1). A redb-backed [`db::Index`]
//! gives keyed lookup; an in-memory `Vec<Message>` cache (rebuilt from the
//! index at [`Store::open`]) serves `QueryMessages` filtering without a table
//! scan per call, mirroring how the event log's tier index works.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::db::Index;
use crate::error::Result;
use crate::event_log::EventLog;
use crate::schema::{
    DailyBrief, Decision, EmailCategory, Feedback, LearnedPattern, LearnerWeights, Message,
    PatternKind, Rule, StoreStats,
};

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub unread_only: bool,
    pub sender_contains: Option<String>,
    pub search_text: Option<String>,
    pub category: Option<EmailCategory>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

pub struct Store {
    index: Index,
    feedback_log: EventLog<Feedback>,
    cache: RwLock<Vec<Message>>,
}

impl Store {
    #[instrument(skip_all, fields(data_dir = %data_dir.as_ref().display()))]
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let index = Index::open(data_dir.join("index.redb"))?;
        let feedback_log: EventLog<Feedback> = EventLog::new(feedback_log_path(data_dir));

        let cache = RwLock::new(index.all_messages()?);
        Ok(Self { index, feedback_log, cache })
    }

    /// Insert or merge on `externalId`; preserves already-set `processingStamps`
    /// so a re-pull of the same message doesn't roll the pipeline back.
    #[instrument(skip_all, fields(external_id = %message.external_id))]
    pub fn upsert_message(&self, mut message: Message) -> Result<()> {
        if let Some(existing) = self.index.get_message_by_external_id(&message.external_id)? {
            message.id = existing.id;
            message.processing_stamps = existing
                .processing_stamps
                .union(&message.processing_stamps)
                .cloned()
                .collect::<HashSet<_>>();
        }
        self.index.put_message(&message)?;

        let mut cache = self.cache.write().expect("store cache lock poisoned");
        if let Some(slot) = cache.iter_mut().find(|m| m.external_id == message.external_id) {
            *slot = message;
        } else {
            cache.push(message);
        }
        Ok(())
    }

    pub fn query_messages(&self, filter: &MessageFilter, pagination: Pagination) -> Vec<Message> {
        let cache = self.cache.read().expect("store cache lock poisoned");
        let mut matched: Vec<&Message> = cache
            .iter()
            .filter(|m| filter.since.is_none_or(|since| m.sent_at >= since))
            .filter(|m| filter.until.is_none_or(|until| m.sent_at <= until))
            .filter(|m| !filter.unread_only || !m.is_read)
            .filter(|m| {
                filter
                    .sender_contains
                    .as_deref()
                    .is_none_or(|needle| m.sender.address.to_lowercase().contains(&needle.to_lowercase()))
            })
            .filter(|m| filter.category.is_none_or(|c| m.category == c))
            .filter(|m| {
                filter.search_text.as_deref().is_none_or(|needle| {
                    let needle = needle.to_lowercase();
                    m.subject.to_lowercase().contains(&needle)
                        || m.body_text.to_lowercase().contains(&needle)
                        || m.sender.address.to_lowercase().contains(&needle)
                })
            })
            .collect();

        matched.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then_with(|| a.id.cmp(&b.id)));
        matched
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.limit)
            .cloned()
            .collect()
    }

    pub fn put_rule(&self, rule: &Rule) -> Result<()> {
        self.index.put_rule(rule)
    }

    pub fn delete_rule(&self, id: &str) -> Result<bool> {
        self.index.delete_rule(id)
    }

    pub fn list_rules(&self, enabled_only: bool) -> Result<Vec<Rule>> {
        let mut rules = self.index.list_rules()?;
        if enabled_only {
            rules.retain(|r| r.enabled && r.compile_error.is_none());
        }
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    pub fn put_decision(&self, decision: &Decision) -> Result<()> {
        self.index.put_decision(decision)
    }

    pub fn get_decision(&self, message_id: &Uuid) -> Result<Option<Decision>> {
        self.index.get_decision(message_id)
    }

    /// Append `feedback` to the append-only feedback log. Deletions are
    /// disallowed by design (§9) — there's no corresponding remove method.
    pub async fn record_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.feedback_log.append(feedback).await.map_err(|e| crate::error::StorageError::Io(
            std::io::Error::other(e.to_string()),
        ))
    }

    pub fn list_feedback(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Feedback>> {
        let all = self
            .feedback_log
            .load()
            .map_err(|e| crate::error::StorageError::Io(std::io::Error::other(e.to_string())))?;
        Ok(match since {
            Some(since) => all.into_iter().filter(|f| f.stamped_at >= since).collect(),
            None => all,
        })
    }

    pub fn put_pattern(&self, pattern: &LearnedPattern) -> Result<()> {
        self.index.put_pattern(pattern)
    }

    pub fn list_patterns(&self, kind: Option<PatternKind>) -> Result<Vec<LearnedPattern>> {
        let mut patterns = self.index.list_patterns()?;
        if let Some(kind) = kind {
            patterns.retain(|p| p.kind == kind);
        }
        Ok(patterns)
    }

    pub fn put_brief(&self, brief: &DailyBrief) -> Result<()> {
        self.index.put_brief(brief)
    }

    pub fn get_brief(&self, date_utc: chrono::NaiveDate) -> Result<Option<DailyBrief>> {
        self.index.get_brief(date_utc)
    }

    /// Persisted feedback-learner state (§4.6), surviving across process
    /// invocations so a correction applied now shapes the next analysis.
    pub fn get_learner_weights(&self) -> Result<LearnerWeights> {
        self.index.get_learner_weights()
    }

    pub fn put_learner_weights(&self, weights: &LearnerWeights) -> Result<()> {
        self.index.put_learner_weights(weights)
    }

    pub fn stats(&self) -> StoreStats {
        let cache = self.cache.read().expect("store cache lock poisoned");
        let mut category_histogram: Vec<(EmailCategory, usize)> = Vec::new();
        for message in cache.iter() {
            match category_histogram.iter_mut().find(|(c, _)| *c == message.category) {
                Some((_, count)) => *count += 1,
                None => category_histogram.push((message.category, 1)),
            }
        }
        StoreStats {
            total: cache.len(),
            unread: cache.iter().filter(|m| !m.is_read).count(),
            category_histogram,
        }
    }
}

fn feedback_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("feedback.jsonl")
}
