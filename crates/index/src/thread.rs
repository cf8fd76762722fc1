use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use triage_store::schema::{ResponseRhythm, ThreadProfile, ThreadStatus, ThreadType};

/// ≥2 regex hits in one family classifies a thread as that `ThreadType`
/// (§4.4). Families are checked in priority order; escalation wins ties
/// since it's the one that should never be silently downgraded.
struct ThreadTypeFamily {
    thread_type: ThreadType,
    patterns: &'static [&'static str],
}

fn families() -> &'static [ThreadTypeFamily] {
    static FAMILIES: OnceLock<Vec<ThreadTypeFamily>> = OnceLock::new();
    FAMILIES.get_or_init(|| {
        vec![
            ThreadTypeFamily {
                thread_type: ThreadType::Escalation,
                patterns: &["escalat", "urgent", "asap", "critical", "emergency"],
            },
            ThreadTypeFamily {
                thread_type: ThreadType::Decision,
                patterns: &["decide", "decision", "approve", "agreed", "let's go with", "sign off"],
            },
            ThreadTypeFamily {
                thread_type: ThreadType::Transactional,
                patterns: &["invoice", "receipt", "order", "payment", "shipped", "tracking"],
            },
            ThreadTypeFamily {
                thread_type: ThreadType::Discussion,
                patterns: &["thoughts", "discuss", "feedback", "opinion", "what do you think"],
            },
        ]
    })
}

const RESOLVED_MARKERS: &[&str] = &["resolved", "closed", "done"];
const ESCALATED_MARKERS: &[&str] = &["escalated"];
const STALLED_MARKERS: &[&str] = &["stalled", "blocked"];

#[derive(Debug, Clone, Default)]
pub struct ThreadAggregate {
    pub participants: Vec<String>,
    pub message_count: usize,
    pub first_message_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub subjects_in_order: Vec<String>,
    pub concatenated_text: String,
    pub message_gaps_secs: Vec<i64>,
    pub explicit_marker: Option<&'static str>,
}

impl ThreadAggregate {
    pub fn observe(&mut self, message: &triage_store::schema::Message) {
        self.message_count += 1;
        if !self.participants.iter().any(|p| p == &message.sender.address) {
            self.participants.push(message.sender.address.clone());
        }

        if let Some(prev) = self.last_message_at {
            if message.received_at > prev {
                self.message_gaps_secs.push((message.received_at - prev).num_seconds());
            }
        }
        self.first_message_at = Some(self.first_message_at.map_or(message.received_at, |t| t.min(message.received_at)));
        self.last_message_at = Some(self.last_message_at.map_or(message.received_at, |t| t.max(message.received_at)));

        self.subjects_in_order.push(message.subject.clone());
        self.concatenated_text.push(' ');
        self.concatenated_text.push_str(&message.subject);
        self.concatenated_text.push(' ');
        self.concatenated_text.push_str(&message.body_text);

        let lower = self.concatenated_text.to_lowercase();
        for marker in RESOLVED_MARKERS {
            if lower.contains(marker) {
                self.explicit_marker = Some("resolved");
            }
        }
        for marker in ESCALATED_MARKERS {
            if lower.contains(marker) {
                self.explicit_marker = Some("escalated");
            }
        }
        for marker in STALLED_MARKERS {
            if lower.contains(marker) {
                self.explicit_marker = Some("stalled");
            }
        }
    }

    pub fn to_profile(&self, thread_id: &str) -> ThreadProfile {
        let now = Utc::now();
        let last = self.last_message_at.unwrap_or(now);
        let first = self.first_message_at.unwrap_or(now);

        ThreadProfile {
            thread_id: thread_id.to_string(),
            participants: self.participants.clone(),
            message_count: self.message_count.max(1),
            first_message_at: first,
            last_message_at: last,
            subject_evolution: subject_evolution(&self.subjects_in_order),
            key_topics: key_topics(&self.concatenated_text),
            thread_type: classify_thread_type(&self.concatenated_text),
            status: classify_status(last, now, self.explicit_marker),
            decisions: Vec::new(),
            open_actions: Vec::new(),
            waiting_for: Vec::new(),
            response_rhythm: classify_rhythm(&self.message_gaps_secs),
            escalation_hits: count_family_hits(&self.concatenated_text, families().iter().find(|f| f.thread_type == ThreadType::Escalation).unwrap().patterns) as u32,
        }
    }
}

/// Strip `Re:`/`Fwd:` prefixes and deduplicate while preserving first-seen order.
fn subject_evolution(subjects: &[String]) -> Vec<String> {
    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    let re = PREFIX_RE.get_or_init(|| Regex::new(r"(?i)^(re|fwd?):\s*").unwrap());

    let mut seen = Vec::new();
    for subject in subjects {
        let mut stripped = subject.as_str();
        loop {
            match re.find(stripped) {
                Some(m) if m.start() == 0 => stripped = &stripped[m.end()..],
                _ => break,
            }
        }
        let stripped = stripped.trim().to_string();
        if !seen.contains(&stripped) {
            seen.push(stripped);
        }
    }
    seen
}

fn key_topics(text: &str) -> Vec<String> {
    let mut counts: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.len() > 4 {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(5).map(|(w, _)| w).collect()
}

fn count_family_hits(text: &str, patterns: &[&str]) -> usize {
    let lower = text.to_lowercase();
    patterns.iter().filter(|p| lower.contains(*p)).count()
}

fn classify_thread_type(text: &str) -> ThreadType {
    families()
        .iter()
        .find(|family| count_family_hits(text, family.patterns) >= 2)
        .map(|family| family.thread_type)
        .unwrap_or(ThreadType::Discussion)
}

fn classify_status(last_message_at: DateTime<Utc>, now: DateTime<Utc>, explicit_marker: Option<&'static str>) -> ThreadStatus {
    match explicit_marker {
        Some("resolved") => return ThreadStatus::Resolved,
        Some("escalated") => return ThreadStatus::Escalated,
        Some("stalled") => return ThreadStatus::Stalled,
        _ => {}
    }
    let age_days = (now - last_message_at).num_days();
    if age_days <= 3 {
        ThreadStatus::Active
    } else if age_days <= 14 {
        ThreadStatus::Dormant
    } else {
        ThreadStatus::Stalled
    }
}

fn classify_rhythm(gaps_secs: &[i64]) -> ResponseRhythm {
    if gaps_secs.is_empty() {
        return ResponseRhythm::Normal;
    }
    let avg = gaps_secs.iter().sum::<i64>() as f64 / gaps_secs.len() as f64;
    let hours = avg / 3600.0;
    if hours < 1.0 {
        ResponseRhythm::Immediate
    } else if hours < 6.0 {
        ResponseRhythm::Fast
    } else if hours < 24.0 {
        ResponseRhythm::Normal
    } else if hours < 72.0 {
        ResponseRhythm::Slow
    } else {
        ResponseRhythm::Stalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_evolution_strips_prefixes_and_dedupes() {
        let subjects = vec!["Launch plan".to_string(), "Re: Launch plan".to_string(), "Fwd: Re: Launch plan".to_string()];
        assert_eq!(subject_evolution(&subjects), vec!["Launch plan".to_string()]);
    }

    #[test]
    fn classify_thread_type_requires_two_hits() {
        assert_eq!(classify_thread_type("urgent"), ThreadType::Discussion);
        assert_eq!(classify_thread_type("urgent escalate now"), ThreadType::Escalation);
    }

    #[test]
    fn classify_status_respects_explicit_marker_over_age() {
        let now = Utc::now();
        let recent = now - chrono::Duration::hours(1);
        assert_eq!(classify_status(recent, now, Some("stalled")), ThreadStatus::Stalled);
        assert_eq!(classify_status(recent, now, None), ThreadStatus::Active);
    }

    #[test]
    fn classify_status_buckets_by_age_without_marker() {
        let now = Utc::now();
        assert_eq!(classify_status(now - chrono::Duration::days(1), now, None), ThreadStatus::Active);
        assert_eq!(classify_status(now - chrono::Duration::days(10), now, None), ThreadStatus::Dormant);
        assert_eq!(classify_status(now - chrono::Duration::days(30), now, None), ThreadStatus::Stalled);
    }
}
