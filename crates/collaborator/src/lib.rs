//! Reconciles the five [`Assessment`]s produced per message (§4.3) into one
//! [`Decision`] (§4.5). Weighted-consensus scoring in the style of
//! `aigent-memory`'s `is_core_eligible`: fixed per-analyzer weights, no
//! learned coefficients here (that's the learner's job).

use std::collections::HashSet;

use chrono::Utc;
use triage_analyzers::spam::SPAM_VETO_LABEL;
use triage_config::CollaboratorConfig;
use triage_store::schema::{Assessment, EmailCategory, TriageBucket, Urgency};

pub mod followups;

/// Per-analyzer consensus weight (§4.5), keyed by `Assessment::analyzer_name`.
fn analyzer_weight(name: &str) -> f32 {
    match name {
        "strategic" => 0.35,
        "relationship" => 0.25,
        "thread" => 0.20,
        "triage" => 0.20,
        _ => 0.0,
    }
}

pub struct Collaborator {
    config: CollaboratorConfig,
}

impl Collaborator {
    pub fn new(config: CollaboratorConfig) -> Self {
        Self { config }
    }

    /// Reconcile every analyzer's assessment of `message_id` into a single
    /// [`Decision`]. `assessments` is expected to contain the output of
    /// `triage_analyzers::run_all`, in any order.
    pub fn decide(
        &self,
        message_id: uuid::Uuid,
        category: EmailCategory,
        assessments: &[Assessment],
        body_text: &str,
        policy_version: u32,
    ) -> triage_store::schema::Decision {
        let vetoed = assessments.iter().any(|a| a.suggested_labels.iter().any(|l| l == SPAM_VETO_LABEL));

        let conflicts = detect_conflicts(assessments);
        let conflict_count = conflicts.len();

        let (score, urgency) = if vetoed {
            (0.0, Urgency::Low)
        } else {
            (consensus_score(assessments), consensus_urgency(assessments))
        };

        let confidence = consensus_confidence(assessments, conflict_count);

        let bucket = if vetoed {
            TriageBucket::SpamFolder
        } else if score >= self.config.priority_threshold {
            TriageBucket::PriorityInbox
        } else if score <= self.config.archive_threshold && self.auto_archive_eligible(category) {
            TriageBucket::AutoArchive
        } else {
            TriageBucket::RegularInbox
        };

        let should_escalate = (score > self.config.escalation_threshold && confidence > 0.6)
            || conflict_count > 2
            || matches!(urgency, Urgency::Critical);

        let applied_labels = union_labels(assessments, self.config.max_labels);
        let rationale = compose_rationale(assessments);

        triage_store::schema::Decision {
            message_id,
            bucket,
            final_score: score,
            confidence,
            applied_labels,
            urgency,
            rationale,
            conflicts,
            should_escalate,
            follow_ups: followups::extract_follow_ups(body_text),
            decided_at: Utc::now(),
            policy_version,
            rules_fired: Vec::new(),
        }
    }

    fn auto_archive_eligible(&self, category: EmailCategory) -> bool {
        let name = category_name(category);
        self.config.auto_archive_categories.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}

fn category_name(category: EmailCategory) -> &'static str {
    match category {
        EmailCategory::Primary => "PRIMARY",
        EmailCategory::Social => "SOCIAL",
        EmailCategory::Promotions => "PROMOTIONS",
        EmailCategory::Updates => "UPDATES",
        EmailCategory::Forums => "FORUMS",
        EmailCategory::Spam => "SPAM",
    }
}

fn urgency_rank(urgency: Urgency) -> u8 {
    match urgency {
        Urgency::Low => 0,
        Urgency::Medium => 1,
        Urgency::High => 2,
        Urgency::Critical => 3,
    }
}

/// (a) score spread >0.3, (b) urgency set >2 distinct values, (c) two
/// high-confidence (≥0.8) assessments differing by >0.2 (§4.5).
fn detect_conflicts(assessments: &[Assessment]) -> Vec<String> {
    let mut conflicts = Vec::new();
    if assessments.is_empty() {
        return conflicts;
    }

    let min_score = assessments.iter().map(|a| a.priority_score).fold(f32::MAX, f32::min);
    let max_score = assessments.iter().map(|a| a.priority_score).fold(f32::MIN, f32::max);
    if max_score - min_score > 0.3 {
        conflicts.push(format!("score spread {:.2} across analyzers", max_score - min_score));
    }

    let distinct_urgencies: HashSet<u8> = assessments.iter().map(|a| urgency_rank(a.urgency)).collect();
    if distinct_urgencies.len() > 2 {
        conflicts.push(format!("{} distinct urgency levels reported", distinct_urgencies.len()));
    }

    let confident: Vec<&Assessment> = assessments.iter().filter(|a| a.confidence >= 0.8).collect();
    for i in 0..confident.len() {
        for j in (i + 1)..confident.len() {
            let diff = (confident[i].priority_score - confident[j].priority_score).abs();
            if diff > 0.2 {
                conflicts.push(format!(
                    "{} and {} both confident but differ by {:.2}",
                    confident[i].analyzer_name, confident[j].analyzer_name, diff
                ));
            }
        }
    }

    conflicts
}

/// Weighted mean of `priority_score` using weight × confidence, renormalized
/// over whichever analyzers are present (§4.5).
fn consensus_score(assessments: &[Assessment]) -> f32 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for a in assessments {
        let w = analyzer_weight(&a.analyzer_name) * a.confidence;
        weighted_sum += w * a.priority_score;
        weight_total += w;
    }
    if weight_total <= 0.0 {
        return 0.0;
    }
    (weighted_sum / weight_total).clamp(0.0, 1.0)
}

/// Majority vote weighted by confidence; ties resolve to the higher urgency.
fn consensus_urgency(assessments: &[Assessment]) -> Urgency {
    let mut weights = [0.0f32; 4];
    for a in assessments {
        weights[urgency_rank(a.urgency) as usize] += a.confidence;
    }
    let max_weight = weights.iter().cloned().fold(f32::MIN, f32::max);
    let winner = (0..4).rev().find(|&i| weights[i] == max_weight).unwrap_or(0);
    match winner {
        3 => Urgency::Critical,
        2 => Urgency::High,
        1 => Urgency::Medium,
        _ => Urgency::Low,
    }
}

fn consensus_confidence(assessments: &[Assessment], conflict_count: usize) -> f32 {
    if assessments.is_empty() {
        return 0.1;
    }
    let mean: f32 = assessments.iter().map(|a| a.confidence).sum::<f32>() / assessments.len() as f32;
    (mean * (1.0 - 0.1 * conflict_count as f32)).max(0.1)
}

fn union_labels(assessments: &[Assessment], cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();
    for a in assessments {
        for label in &a.suggested_labels {
            if label == SPAM_VETO_LABEL {
                continue;
            }
            if seen.insert(label.clone()) {
                labels.push(label.clone());
                if labels.len() >= cap {
                    return labels;
                }
            }
        }
    }
    labels
}

fn compose_rationale(assessments: &[Assessment]) -> String {
    let parts: Vec<&str> = assessments
        .iter()
        .filter(|a| a.confidence >= 0.6)
        .map(|a| a.rationale.as_str())
        .collect();
    if parts.is_empty() {
        "limited confidence consensus".to_string()
    } else {
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(name: &str, score: f32, confidence: f32, urgency: Urgency) -> Assessment {
        Assessment {
            analyzer_name: name.to_string(),
            priority_score: score,
            confidence,
            urgency,
            suggested_labels: Vec::new(),
            risks: Vec::new(),
            opportunities: Vec::new(),
            rationale: format!("{name} says {score}"),
        }
    }

    #[test]
    fn spam_veto_overrides_everything() {
        let collaborator = Collaborator::new(CollaboratorConfig::default());
        let mut spam = assessment("spam", 0.0, 0.9, Urgency::Low);
        spam.suggested_labels.push(SPAM_VETO_LABEL.to_string());
        let strategic = assessment("strategic", 0.95, 0.95, Urgency::Critical);
        let decision = collaborator.decide(uuid::Uuid::new_v4(), EmailCategory::Primary, &[spam, strategic], "", 1);
        assert_eq!(decision.bucket, TriageBucket::SpamFolder);
    }

    #[test]
    fn high_consensus_score_routes_to_priority_inbox() {
        let collaborator = Collaborator::new(CollaboratorConfig::default());
        let assessments = vec![
            assessment("strategic", 0.9, 0.9, Urgency::High),
            assessment("relationship", 0.85, 0.8, Urgency::High),
            assessment("thread", 0.8, 0.7, Urgency::Medium),
            assessment("triage", 0.9, 0.8, Urgency::High),
        ];
        let decision = collaborator.decide(uuid::Uuid::new_v4(), EmailCategory::Primary, &assessments, "", 1);
        assert_eq!(decision.bucket, TriageBucket::PriorityInbox);
        assert!(decision.should_escalate);
    }

    #[test]
    fn low_score_promotions_message_auto_archives() {
        let collaborator = Collaborator::new(CollaboratorConfig::default());
        let assessments = vec![
            assessment("strategic", 0.2, 0.7, Urgency::Low),
            assessment("relationship", 0.3, 0.6, Urgency::Low),
            assessment("thread", 0.2, 0.5, Urgency::Low),
            assessment("triage", 0.1, 0.6, Urgency::Low),
        ];
        let decision = collaborator.decide(uuid::Uuid::new_v4(), EmailCategory::Promotions, &assessments, "", 1);
        assert_eq!(decision.bucket, TriageBucket::AutoArchive);
    }

    #[test]
    fn wide_score_spread_is_recorded_as_a_conflict() {
        let assessments = vec![assessment("strategic", 0.9, 0.9, Urgency::High), assessment("triage", 0.3, 0.9, Urgency::Low)];
        let conflicts = detect_conflicts(&assessments);
        assert!(!conflicts.is_empty());
    }

    #[test]
    fn labels_are_deduplicated_and_capped() {
        let mut a = assessment("strategic", 0.5, 0.8, Urgency::Medium);
        a.suggested_labels = vec!["x".into(), "y".into()];
        let mut b = assessment("relationship", 0.5, 0.8, Urgency::Medium);
        b.suggested_labels = vec!["y".into(), "z".into(), "w".into()];
        let labels = union_labels(&[a, b], 3);
        assert_eq!(labels, vec!["x".to_string(), "y".to_string(), "z".to_string()]);
    }
}
