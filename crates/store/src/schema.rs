//! Core data model (spec.md §3): `Message`, `Rule`, derived profiles, and the
//! persisted artifacts of the decision pipeline.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum EmailCategory {
    Primary,
    Social,
    Promotions,
    Updates,
    Forums,
    Spam,
}

impl Default for EmailCategory {
    fn default() -> Self {
        EmailCategory::Primary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub enum EmailPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for EmailPriority {
    fn default() -> Self {
        EmailPriority::Normal
    }
}

/// Per-message flags recording completion of a pipeline stage (§3, §5).
/// Monotonically grows — a stamp is never removed once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum ProcessingStamp {
    RulesApplied,
    Analyzed,
    Decided,
    LabelsPushed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderAddress {
    pub address: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub external_id: String,
    pub thread_id: String,
    pub sender: SenderAddress,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub is_read: bool,
    pub is_flagged: bool,
    pub category: EmailCategory,
    pub priority: EmailPriority,
    pub tags: HashSet<String>,
    pub provider_labels: HashSet<String>,
    pub processing_stamps: HashSet<ProcessingStamp>,
    pub has_attachments: bool,
    pub attachment_count: usize,
    /// Set when `category` was defaulted to `Primary` rather than observed
    /// (REDESIGN FLAGS / open question iii) — excluded from learner weighting
    /// so a single default doesn't get over-counted as a real signal.
    pub category_inferred: bool,
}

impl Message {
    pub fn stamp(&mut self, stamp: ProcessingStamp) {
        self.processing_stamps.insert(stamp);
    }

    pub fn has_stamp(&self, stamp: ProcessingStamp) -> bool {
        self.processing_stamps.contains(&stamp)
    }

    pub fn sender_domain(&self) -> &str {
        self.sender.address.split('@').nth(1).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionField {
    Subject,
    SenderAddress,
    SenderDomain,
    BodyText,
    HasAttachments,
    AttachmentCount,
    Recipients,
    Category,
    Priority,
    Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    NotEquals,
    NotContains,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuleActions {
    pub set_category: Option<EmailCategory>,
    pub set_priority: Option<EmailPriority>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub mark_read: Option<bool>,
    pub mark_flagged: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub priority: i32,
    pub conditions: Vec<RuleCondition>,
    pub actions: RuleActions,
    /// Set when a condition's regex failed to compile; the rule never fires
    /// while this is `Some` (§4.2, §7 RuleCompileError).
    pub compile_error: Option<String>,
    pub matches: u64,
    pub matches_correct: u64,
}

impl Rule {
    pub fn accuracy(&self) -> Option<f32> {
        if self.matches == 0 {
            None
        } else {
            Some(self.matches_correct as f32 / self.matches as f32)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub enum RelationshipClass {
    Founder,
    Board,
    Investor,
    Customer,
    Team,
    Advisor,
    VendorCritical,
    VendorImportant,
    Vendor,
    Unknown,
}

impl Default for RelationshipClass {
    fn default() -> Self {
        RelationshipClass::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategicClass {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderProfile {
    pub address: String,
    pub display_name: Option<String>,
    pub total_messages: u64,
    pub recent_messages: u64,
    pub relationship_class: RelationshipClass,
    pub importance_score: f32,
    pub strategic_class: StrategicClass,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub top_keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadType {
    Decision,
    Discussion,
    Transactional,
    Escalation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadStatus {
    Active,
    Dormant,
    Stalled,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseRhythm {
    Immediate,
    Fast,
    Normal,
    Slow,
    Stalled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadProfile {
    pub thread_id: String,
    pub participants: Vec<String>,
    pub message_count: usize,
    pub first_message_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub subject_evolution: Vec<String>,
    pub key_topics: Vec<String>,
    pub thread_type: ThreadType,
    pub status: ThreadStatus,
    pub decisions: Vec<String>,
    pub open_actions: Vec<String>,
    pub waiting_for: Vec<String>,
    pub response_rhythm: ResponseRhythm,
    pub escalation_hits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub analyzer_name: String,
    pub priority_score: f32,
    pub confidence: f32,
    pub urgency: Urgency,
    pub suggested_labels: Vec<String>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriageBucket {
    PriorityInbox,
    RegularInbox,
    AutoArchive,
    SpamFolder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub message_id: Uuid,
    pub bucket: TriageBucket,
    pub final_score: f32,
    pub confidence: f32,
    pub applied_labels: Vec<String>,
    pub urgency: Urgency,
    pub rationale: String,
    pub conflicts: Vec<String>,
    pub should_escalate: bool,
    pub follow_ups: Vec<String>,
    pub decided_at: DateTime<Utc>,
    pub policy_version: u32,
    /// IDs of rules that fired on this message during the rules-engine pass
    /// (§4.6), in firing order. Feeds rule accuracy tracking once feedback
    /// arrives for this message.
    pub rules_fired: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub message_id: Uuid,
    pub original_decision: TriageBucket,
    pub corrected_bucket: TriageBucket,
    pub user_note: Option<String>,
    pub stamped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    SenderCategory,
    SubjectKeywordCategory,
    SubjectKeywordPriority,
    ContentFeature,
    Temporal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub kind: PatternKind,
    pub key: String,
    pub predicted_attribute: String,
    pub predicted_value: String,
    pub confidence: f32,
    pub sample_size: u32,
    pub updated_at: DateTime<Utc>,
}

/// Durable form of the feedback learner's per-sender/per-token adjustments
/// (§4.6). A single instance is kept in Store under a fixed key so weights
/// learned in one CLI invocation are consumed by the next, rather than
/// discarded per process as an in-memory-only `FeedbackLearner` would.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerWeights {
    pub sender_weights: HashMap<String, f32>,
    pub token_urgency_weights: HashMap<String, f32>,
    pub false_positive_keywords: HashSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBrief {
    pub date_utc: chrono::NaiveDate,
    pub total_messages: usize,
    pub unread_count: usize,
    pub category_histogram: Vec<(EmailCategory, usize)>,
    pub priority_histogram: Vec<(EmailPriority, usize)>,
    pub headline: String,
    pub narrative: String,
    pub action_items: Vec<String>,
    pub deadlines: Vec<String>,
    pub key_characters: Vec<String>,
    pub themes: Vec<String>,
    pub estimated_read_seconds: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total: usize,
    pub unread: usize,
    pub category_histogram: Vec<(EmailCategory, usize)>,
}

/// Closed error-kind sum type shared across the pipeline (§7, §9).
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("connector auth error: {0}")]
    ConnectorAuth(String),
    #[error("connector rate limited, retry after {retry_after_secs}s")]
    ConnectorRateLimit { retry_after_secs: u64 },
    #[error("connector transient error: {0}")]
    ConnectorTransient(String),
    #[error("llm unavailable: {0}")]
    LlmUnavailable(String),
    #[error("rule compile error: {0}")]
    RuleCompile(String),
    #[error("fatal: {0}")]
    Fatal(String),
}
