//! Learns from user corrections (§4.6): per-sender importance nudges,
//! category-preference counters, token urgency weights, hour-of-day
//! histograms, periodic pattern synthesis, and rule performance tracking.
//! All in-memory state here is owned by whoever runs the scheduler's learn
//! phase; persistence of synthesized patterns/rules goes through `Store`.

pub mod patterns;
pub mod rules;

use std::collections::{HashMap, HashSet};

use triage_config::LearnerConfig;
use triage_store::schema::{LearnerWeights, Message, TriageBucket};

const STOPWORDS: &[&str] = &["the", "a", "an", "and", "or", "to", "of", "for", "in", "on", "is", "re", "fwd", "this", "that", "with"];

/// Keywords that, were they present, contributed to a prior urgency-factor
/// score. Kept separate from `triage-analyzers`'s own table so the learner
/// has no compile-time dependency on the analyzer crate; the sets are
/// expected to stay in sync by convention.
const URGENT_KEYWORDS: &[&str] = &["urgent", "asap", "immediate", "deadline", "important", "please respond", "follow up"];

#[derive(Debug, Default)]
struct LearnerState {
    sender_weights: HashMap<String, f32>,
    category_bucket_counts: HashMap<(String, TriageBucket), u32>,
    token_urgency_weights: HashMap<String, f32>,
    false_positive_keywords: HashSet<String>,
    hour_histogram_priority: [u32; 24],
    hour_histogram_archive: [u32; 24],
}

pub struct FeedbackLearner {
    config: LearnerConfig,
    state: LearnerState,
}

impl FeedbackLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self { config, state: LearnerState::default() }
    }

    /// Build a learner seeded with previously persisted weights (§4.6 "on
    /// next analysis"), so a correction recorded last run still shapes this
    /// one. The per-process-only tallies (category/hour histograms) always
    /// start fresh; only the weights other crates actually consume survive.
    pub fn from_weights(config: LearnerConfig, weights: LearnerWeights) -> Self {
        let state = LearnerState {
            sender_weights: weights.sender_weights,
            token_urgency_weights: weights.token_urgency_weights,
            false_positive_keywords: weights.false_positive_keywords,
            ..LearnerState::default()
        };
        Self { config, state }
    }

    /// Snapshot the durable subset of this learner's state for persistence.
    pub fn weights(&self) -> LearnerWeights {
        LearnerWeights {
            sender_weights: self.state.sender_weights.clone(),
            token_urgency_weights: self.state.token_urgency_weights.clone(),
            false_positive_keywords: self.state.false_positive_keywords.clone(),
        }
    }

    pub fn sender_weight(&self, address: &str) -> f32 {
        *self.state.sender_weights.get(&address.to_lowercase()).unwrap_or(&0.5)
    }

    pub fn token_urgency_weight(&self, token: &str) -> f32 {
        *self.state.token_urgency_weights.get(&token.to_lowercase()).unwrap_or(&0.0)
    }

    pub fn is_false_positive_urgency_keyword(&self, keyword: &str) -> bool {
        self.state.false_positive_keywords.contains(&keyword.to_lowercase())
    }

    /// §4.6 "On feedback". `decided_hour` is the local hour (0-23) the
    /// original Decision was made at, for the hour-of-day histograms.
    pub fn apply_feedback(&mut self, corrected_bucket: TriageBucket, message: &Message, decided_hour: u32) {
        let delta = match corrected_bucket {
            TriageBucket::PriorityInbox => 0.1,
            TriageBucket::AutoArchive => -0.1,
            TriageBucket::SpamFolder => -0.3,
            TriageBucket::RegularInbox => 0.0,
        };
        let key = message.sender.address.to_lowercase();
        let weight = self.state.sender_weights.entry(key).or_insert(0.5);
        *weight = (*weight + delta * self.config.learning_rate).clamp(0.0, 1.0);

        let category_key = (format!("{:?}", message.category), corrected_bucket);
        *self.state.category_bucket_counts.entry(category_key).or_insert(0) += 1;

        match corrected_bucket {
            TriageBucket::PriorityInbox => {
                for token in body_tokens(&message.body_text) {
                    let w = self.state.token_urgency_weights.entry(token).or_insert(0.0);
                    *w = (*w + 0.05).min(1.0);
                }
                let hour = decided_hour.min(23) as usize;
                self.state.hour_histogram_priority[hour] += 1;
            }
            TriageBucket::AutoArchive => {
                let text = format!("{} {}", message.subject, message.body_text).to_lowercase();
                for keyword in URGENT_KEYWORDS {
                    if text.contains(keyword) {
                        self.state.false_positive_keywords.insert(keyword.to_string());
                    }
                }
                let hour = decided_hour.min(23) as usize;
                self.state.hour_histogram_archive[hour] += 1;
            }
            _ => {}
        }
    }

    pub fn hour_histograms(&self) -> (&[u32; 24], &[u32; 24]) {
        (&self.state.hour_histogram_priority, &self.state.hour_histogram_archive)
    }

    /// How often `category` has been corrected to `bucket` so far.
    pub fn category_bucket_count(&self, category: &str, bucket: TriageBucket) -> u32 {
        *self.state.category_bucket_counts.get(&(category.to_string(), bucket)).unwrap_or(&0)
    }
}

fn body_tokens(body: &str) -> Vec<String> {
    body.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet as Set;
    use triage_store::schema::{EmailCategory, EmailPriority, SenderAddress};
    use uuid::Uuid;

    fn message(address: &str, body: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            external_id: Uuid::new_v4().to_string(),
            thread_id: "t1".to_string(),
            sender: SenderAddress { address: address.to_string(), display_name: None },
            recipients: vec!["me@example.com".to_string()],
            subject: "subject".to_string(),
            body_text: body.to_string(),
            body_html: None,
            sent_at: Utc::now(),
            received_at: Utc::now(),
            is_read: false,
            is_flagged: false,
            category: EmailCategory::Primary,
            priority: EmailPriority::Normal,
            tags: Set::new(),
            provider_labels: Set::new(),
            processing_stamps: Set::new(),
            has_attachments: false,
            attachment_count: 0,
            category_inferred: false,
        }
    }

    #[test]
    fn priority_correction_raises_sender_weight() {
        let mut learner = FeedbackLearner::new(LearnerConfig::default());
        let msg = message("a@b.com", "please review the attached budget document");
        learner.apply_feedback(TriageBucket::PriorityInbox, &msg, 9);
        assert!(learner.sender_weight("a@b.com") > 0.5);
    }

    #[test]
    fn spam_correction_lowers_sender_weight_more_than_archive() {
        let mut spam_learner = FeedbackLearner::new(LearnerConfig::default());
        let mut archive_learner = FeedbackLearner::new(LearnerConfig::default());
        let msg = message("a@b.com", "whatever");
        spam_learner.apply_feedback(TriageBucket::SpamFolder, &msg, 9);
        archive_learner.apply_feedback(TriageBucket::AutoArchive, &msg, 9);
        assert!(spam_learner.sender_weight("a@b.com") < archive_learner.sender_weight("a@b.com"));
    }

    #[test]
    fn priority_correction_learns_body_token_urgency() {
        let mut learner = FeedbackLearner::new(LearnerConfig::default());
        let msg = message("a@b.com", "please review the quarterly budget document");
        learner.apply_feedback(TriageBucket::PriorityInbox, &msg, 9);
        assert!(learner.token_urgency_weight("quarterly") > 0.0);
        assert_eq!(learner.token_urgency_weight("the"), 0.0);
    }

    #[test]
    fn archive_correction_on_urgent_text_marks_false_positive_keyword() {
        let mut learner = FeedbackLearner::new(LearnerConfig::default());
        let msg = message("a@b.com", "this is urgent, please handle asap");
        learner.apply_feedback(TriageBucket::AutoArchive, &msg, 14);
        assert!(learner.is_false_positive_urgency_keyword("urgent"));
    }
}
