//! Secondary index backed by [`redb`] for fast keyed lookup of messages,
//! rules, decisions, patterns, and briefs.
//!
//! The JSONL event logs (`Message` upserts, `Feedback` records) remain the
//! canonical source of truth. This index is a write-through cache rebuilt
//! from the log on open if missing, so losing the redb file loses nothing.
//!
//! # Tables
//!
//! | Name          | Key                      | Value                    |
//! |---------------|--------------------------|---------------------------|
//! | `messages`    | external_id (str)        | JSON-encoded [`Message`]  |
//! | `msg_by_id`   | UUID string (36c)        | external_id (str)         |
//! | `rules`       | rule id (str)            | JSON-encoded [`Rule`]     |
//! | `decisions`   | message UUID string      | JSON-encoded [`Decision`] |
//! | `patterns`    | `kind:key` (str)         | JSON-encoded [`LearnedPattern`] |
//! | `briefs`      | date (YYYY-MM-DD, str)   | JSON-encoded [`DailyBrief`] |
//! | `learner_weights` | fixed key (`"state"`) | JSON-encoded [`LearnerWeights`] |

use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::Result;
use crate::schema::{DailyBrief, Decision, LearnedPattern, LearnerWeights, Message, Rule};

const MESSAGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");
const MSG_BY_ID_TABLE: TableDefinition<&str, &str> = TableDefinition::new("msg_by_id");
const RULES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("rules");
const DECISIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("decisions");
const PATTERNS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("patterns");
const BRIEFS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("briefs");
const LEARNER_WEIGHTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("learner_weights");
const LEARNER_WEIGHTS_KEY: &str = "state";

pub struct Index {
    db: Database,
    path: PathBuf,
}

impl Index {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)?;
        {
            let tx = db.begin_write()?;
            tx.open_table(MESSAGES_TABLE)?;
            tx.open_table(MSG_BY_ID_TABLE)?;
            tx.open_table(RULES_TABLE)?;
            tx.open_table(DECISIONS_TABLE)?;
            tx.open_table(PATTERNS_TABLE)?;
            tx.open_table(BRIEFS_TABLE)?;
            tx.open_table(LEARNER_WEIGHTS_TABLE)?;
            tx.commit()?;
        }
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn put_message(&self, message: &Message) -> Result<()> {
        let bytes = serde_json::to_vec(message)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(MESSAGES_TABLE)?;
            tbl.insert(message.external_id.as_str(), bytes.as_slice())?;
            let mut by_id = tx.open_table(MSG_BY_ID_TABLE)?;
            by_id.insert(message.id.to_string().as_str(), message.external_id.as_str())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_message_by_external_id(&self, external_id: &str) -> Result<Option<Message>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(MESSAGES_TABLE)?;
        match tbl.get(external_id)? {
            None => Ok(None),
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
        }
    }

    pub fn all_messages(&self) -> Result<Vec<Message>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(MESSAGES_TABLE)?;
        let mut out = Vec::with_capacity(tbl.len()? as usize);
        for row in tbl.iter()? {
            let (_, v) = row?;
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }

    pub fn message_count(&self) -> Result<usize> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(MESSAGES_TABLE)?;
        Ok(tbl.len()? as usize)
    }

    pub fn put_rule(&self, rule: &Rule) -> Result<()> {
        let bytes = serde_json::to_vec(rule)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(RULES_TABLE)?;
            tbl.insert(rule.id.as_str(), bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_rule(&self, id: &str) -> Result<bool> {
        let tx = self.db.begin_write()?;
        let removed = {
            let mut tbl = tx.open_table(RULES_TABLE)?;
            tbl.remove(id)?.is_some()
        };
        tx.commit()?;
        Ok(removed)
    }

    pub fn list_rules(&self) -> Result<Vec<Rule>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(RULES_TABLE)?;
        let mut out = Vec::new();
        for row in tbl.iter()? {
            let (_, v) = row?;
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }

    pub fn put_decision(&self, decision: &Decision) -> Result<()> {
        let bytes = serde_json::to_vec(decision)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(DECISIONS_TABLE)?;
            tbl.insert(decision.message_id.to_string().as_str(), bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_decision(&self, message_id: &uuid::Uuid) -> Result<Option<Decision>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(DECISIONS_TABLE)?;
        match tbl.get(message_id.to_string().as_str())? {
            None => Ok(None),
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
        }
    }

    pub fn put_pattern(&self, pattern: &LearnedPattern) -> Result<()> {
        let key = format!("{:?}:{}", pattern.kind, pattern.key);
        let bytes = serde_json::to_vec(pattern)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(PATTERNS_TABLE)?;
            tbl.insert(key.as_str(), bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_patterns(&self) -> Result<Vec<LearnedPattern>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(PATTERNS_TABLE)?;
        let mut out = Vec::new();
        for row in tbl.iter()? {
            let (_, v) = row?;
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }

    pub fn put_brief(&self, brief: &DailyBrief) -> Result<()> {
        let key = brief.date_utc.format("%Y-%m-%d").to_string();
        let bytes = serde_json::to_vec(brief)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(BRIEFS_TABLE)?;
            tbl.insert(key.as_str(), bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_brief(&self, date_utc: chrono::NaiveDate) -> Result<Option<DailyBrief>> {
        let key = date_utc.format("%Y-%m-%d").to_string();
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(BRIEFS_TABLE)?;
        match tbl.get(key.as_str())? {
            None => Ok(None),
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
        }
    }

    pub fn put_learner_weights(&self, weights: &LearnerWeights) -> Result<()> {
        let bytes = serde_json::to_vec(weights)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(LEARNER_WEIGHTS_TABLE)?;
            tbl.insert(LEARNER_WEIGHTS_KEY, bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_learner_weights(&self) -> Result<LearnerWeights> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(LEARNER_WEIGHTS_TABLE)?;
        match tbl.get(LEARNER_WEIGHTS_KEY)? {
            None => Ok(LearnerWeights::default()),
            Some(v) => Ok(serde_json::from_slice(v.value())?),
        }
    }
}
