//! The four constrained JSON shapes the core ever asks the LLM for (§6). No
//! free-form text is accepted back into the pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategicImportance {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicAnalysis {
    pub labels: Vec<String>,
    #[serde(rename = "strategicImportance")]
    pub strategic_importance: StrategicImportance,
    #[serde(rename = "requiresAction")]
    pub requires_action: bool,
    #[serde(rename = "delegationHint", skip_serializing_if = "Option::is_none")]
    pub delegation_hint: Option<String>,
    #[serde(rename = "estMinutesToHandle")]
    pub est_minutes_to_handle: i32,
    #[serde(rename = "keyInsight")]
    pub key_insight: String,
    #[serde(rename = "decisionPoints")]
    pub decision_points: Vec<String>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatusHint {
    Resolved,
    Ongoing,
    Stalled,
    Escalated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub summary: String,
    #[serde(rename = "keyDecisions")]
    pub key_decisions: Vec<String>,
    #[serde(rename = "actionItems")]
    pub action_items: Vec<ActionItem>,
    pub status: ThreadStatusHint,
    pub priority: String,
    pub sentiment: Sentiment,
    #[serde(rename = "nextSteps")]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyNarrative {
    pub headline: String,
    pub narrative: String,
    #[serde(rename = "actionItems")]
    pub action_items: Vec<String>,
    pub deadlines: Vec<String>,
    pub characters: Vec<String>,
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyScore {
    pub score: f32,
}
