//! Narrative brief generation (§4.8), the Scheduler's brief-phase
//! sub-component: compute rule-based facts about a day's messages, then
//! either call the LLM with a constrained prompt or fall back to a fixed
//! template that still conveys count, participants, themes, and unread
//! count when the LLM is unavailable.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, Timelike, Utc};
use triage_llm::LlmClient;
use triage_store::schema::{DailyBrief, EmailCategory, EmailPriority, Message};

const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    ("work", &["project", "deadline", "meeting", "report", "deliverable"]),
    ("scheduling", &["calendar", "schedule", "reschedule", "invite", "availability"]),
    ("finance", &["invoice", "payment", "budget", "expense", "billing"]),
    ("project management", &["sprint", "roadmap", "milestone", "backlog", "status"]),
    ("personal", &["family", "vacation", "birthday", "dinner", "weekend"]),
    ("travel", &["flight", "itinerary", "hotel", "booking", "trip"]),
    ("support", &["ticket", "issue", "bug", "outage", "incident"]),
];

struct DayFacts {
    total_messages: usize,
    unread_count: usize,
    category_histogram: Vec<(EmailCategory, usize)>,
    priority_histogram: Vec<(EmailPriority, usize)>,
    key_people: Vec<String>,
    story_arcs: Vec<(String, usize)>,
    morning: usize,
    afternoon: usize,
    evening: usize,
    peak_hour: u32,
    themes: Vec<String>,
    urgency_clusters: usize,
}

fn compute_facts(messages: &[Message]) -> DayFacts {
    let mut category_histogram: Vec<(EmailCategory, usize)> = Vec::new();
    let mut priority_histogram: Vec<(EmailPriority, usize)> = Vec::new();
    let mut sender_counts: HashMap<String, usize> = HashMap::new();
    let mut arc_counts: HashMap<String, usize> = HashMap::new();
    let mut hour_counts = [0usize; 24];
    let mut theme_hits: HashMap<&'static str, usize> = HashMap::new();

    for message in messages {
        bump(&mut category_histogram, message.category);
        bump_priority(&mut priority_histogram, message.priority);
        *sender_counts.entry(message.sender.address.clone()).or_insert(0) += 1;
        *arc_counts.entry(normalize_subject(&message.subject)).or_insert(0) += 1;
        hour_counts[message.received_at.hour() as usize] += 1;

        let text = format!("{} {}", message.subject, message.body_text).to_lowercase();
        for (theme, keywords) in THEME_KEYWORDS {
            if keywords.iter().any(|k| text.contains(k)) {
                *theme_hits.entry(theme).or_insert(0) += 1;
            }
        }
    }

    let mut key_people: Vec<(String, usize)> = sender_counts.into_iter().collect();
    key_people.sort_by_key(|p| std::cmp::Reverse(p.1));
    let key_people: Vec<String> = key_people.into_iter().take(5).map(|(s, _)| s).collect();

    let mut story_arcs: Vec<(String, usize)> = arc_counts.into_iter().filter(|(_, n)| *n >= 2).collect();
    story_arcs.sort_by_key(|a| std::cmp::Reverse(a.1));

    let morning: usize = (6..12).map(|h| hour_counts[h]).sum();
    let afternoon: usize = (12..18).map(|h| hour_counts[h]).sum();
    let evening: usize = hour_counts.iter().enumerate().filter(|(h, _)| !(6..18).contains(h)).map(|(_, c)| *c).sum();
    let peak_hour = (0..24).max_by_key(|&h| hour_counts[h]).unwrap_or(0) as u32;

    let mut themes: Vec<(&'static str, usize)> = theme_hits.into_iter().collect();
    themes.sort_by_key(|t| std::cmp::Reverse(t.1));
    let themes: Vec<String> = themes.into_iter().take(3).map(|(t, _)| t.to_string()).collect();

    let urgency_clusters = count_urgency_clusters(messages);

    DayFacts {
        total_messages: messages.len(),
        unread_count: messages.iter().filter(|m| !m.is_read).count(),
        category_histogram,
        priority_histogram,
        key_people,
        story_arcs,
        morning,
        afternoon,
        evening,
        peak_hour,
        themes,
        urgency_clusters,
    }
}

fn normalize_subject(subject: &str) -> String {
    let mut s = subject.trim();
    loop {
        let lower = s.to_lowercase();
        if let Some(rest) = lower.strip_prefix("re:").or_else(|| lower.strip_prefix("fwd:")) {
            s = s[s.len() - rest.len()..].trim_start();
        } else {
            break;
        }
    }
    s.to_lowercase()
}

/// ≥2 urgent/high-priority messages within a 2h window (§4.8 "urgency clusters").
fn count_urgency_clusters(messages: &[Message]) -> usize {
    let mut urgent_times: Vec<chrono::DateTime<Utc>> = messages
        .iter()
        .filter(|m| matches!(m.priority, EmailPriority::Urgent | EmailPriority::High))
        .map(|m| m.received_at)
        .collect();
    urgent_times.sort();

    let mut clusters = 0;
    let mut i = 0;
    while i < urgent_times.len() {
        let mut j = i + 1;
        while j < urgent_times.len() && urgent_times[j] - urgent_times[i] <= chrono::Duration::hours(2) {
            j += 1;
        }
        if j - i >= 2 {
            clusters += 1;
            i = j;
        } else {
            i += 1;
        }
    }
    clusters
}

fn bump(histogram: &mut Vec<(EmailCategory, usize)>, category: EmailCategory) {
    match histogram.iter_mut().find(|(c, _)| *c == category) {
        Some((_, count)) => *count += 1,
        None => histogram.push((category, 1)),
    }
}

fn bump_priority(histogram: &mut Vec<(EmailPriority, usize)>, priority: EmailPriority) {
    match histogram.iter_mut().find(|(p, _)| *p == priority) {
        Some((_, count)) => *count += 1,
        None => histogram.push((priority, 1)),
    }
}

fn template_narrative(facts: &DayFacts) -> (String, String, Vec<String>) {
    let headline = format!("{} messages today, {} unread", facts.total_messages, facts.unread_count);

    let people = if facts.key_people.is_empty() { "no frequent correspondents".to_string() } else { facts.key_people.join(", ") };
    let themes = if facts.themes.is_empty() { "no dominant theme".to_string() } else { facts.themes.join(", ") };

    let narrative = format!(
        "Today brought {} messages, with {} still unread. The most frequent correspondents were {}. \
         {} threads had at least two exchanges, and the conversation leaned toward {}. \
         Activity peaked around hour {} of the day, with {} messages in the morning, {} in the afternoon, and {} in the evening. \
         {} cluster(s) of back-to-back urgent messages arrived within a two-hour window, worth a second look if you haven't already.",
        facts.total_messages,
        facts.unread_count,
        people,
        facts.story_arcs.len(),
        themes,
        facts.peak_hour,
        facts.morning,
        facts.afternoon,
        facts.evening,
        facts.urgency_clusters,
    );

    let action_items = if facts.unread_count > 0 {
        vec![format!("Clear {} unread message(s)", facts.unread_count)]
    } else {
        Vec::new()
    };

    (headline, narrative, action_items)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Build a `DailyBrief` for `date` from `messages` (already filtered to that
/// date's `receivedAt` window by the caller). Tries the LLM first, falls
/// back to the fixed template on any error.
pub async fn generate_brief(
    date: NaiveDate,
    messages: &[Message],
    llm: Option<&dyn LlmClient>,
    timeout: Duration,
    backoff: Duration,
) -> DailyBrief {
    let facts = compute_facts(messages);

    let (headline, narrative, action_items, deadlines, characters, themes) = if let Some(client) = llm {
        let digest = build_digest(&facts, messages);
        match triage_llm::daily_narrative(client, &digest, timeout, backoff).await {
            Ok(n) => (n.headline, n.narrative, n.action_items, n.deadlines, n.characters, n.themes),
            Err(err) => {
                tracing::warn!(error = %err, "brief phase: llm unavailable, using template narrative");
                let (headline, narrative, action_items) = template_narrative(&facts);
                (headline, narrative, action_items, Vec::new(), facts.key_people.clone(), facts.themes.clone())
            }
        }
    } else {
        let (headline, narrative, action_items) = template_narrative(&facts);
        (headline, narrative, action_items, Vec::new(), facts.key_people.clone(), facts.themes.clone())
    };

    let estimated_read_seconds = ((word_count(&narrative) as f32 / 200.0) * 60.0).round() as u32;

    DailyBrief {
        date_utc: date,
        total_messages: facts.total_messages,
        unread_count: facts.unread_count,
        category_histogram: facts.category_histogram,
        priority_histogram: facts.priority_histogram,
        headline,
        narrative,
        action_items,
        deadlines,
        key_characters: characters,
        themes,
        estimated_read_seconds,
        generated_at: Utc::now(),
    }
}

fn build_digest(facts: &DayFacts, messages: &[Message]) -> String {
    let subjects: Vec<&str> = messages.iter().take(20).map(|m| m.subject.as_str()).collect();
    format!(
        "{} messages, {} unread. Frequent senders: {}. Recurring threads: {}. Candidate themes: {}. Subjects: {}",
        facts.total_messages,
        facts.unread_count,
        facts.key_people.join(", "),
        facts.story_arcs.len(),
        facts.themes.join(", "),
        subjects.join(" | "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use triage_store::schema::SenderAddress;
    use uuid::Uuid;

    fn message(subject: &str, sender: &str, hour: u32, priority: EmailPriority, unread: bool) -> Message {
        let today = Utc::now().date_naive().and_hms_opt(hour, 0, 0).unwrap().and_utc();
        Message {
            id: Uuid::new_v4(),
            external_id: Uuid::new_v4().to_string(),
            thread_id: "t1".to_string(),
            sender: SenderAddress { address: sender.to_string(), display_name: None },
            recipients: vec!["me@example.com".to_string()],
            subject: subject.to_string(),
            body_text: "project update for the roadmap".to_string(),
            body_html: None,
            sent_at: today,
            received_at: today,
            is_read: !unread,
            is_flagged: false,
            category: EmailCategory::Primary,
            priority,
            tags: HashSet::new(),
            provider_labels: HashSet::new(),
            processing_stamps: HashSet::new(),
            has_attachments: false,
            attachment_count: 0,
            category_inferred: false,
        }
    }

    #[tokio::test]
    async fn template_brief_conveys_count_and_unread_without_an_llm() {
        let messages = vec![
            message("Project status", "a@b.com", 9, EmailPriority::Normal, true),
            message("Re: Project status", "a@b.com", 10, EmailPriority::Normal, false),
        ];
        let today = Utc::now().date_naive();
        let brief = generate_brief(today, &messages, None, Duration::from_secs(1), Duration::from_millis(1)).await;
        assert_eq!(brief.total_messages, 2);
        assert_eq!(brief.unread_count, 1);
        assert!(brief.narrative.contains('2') || brief.headline.contains('2'));
        assert!(brief.estimated_read_seconds > 0);
    }

    #[test]
    fn reply_prefixes_are_normalized_into_the_same_story_arc() {
        let messages = vec![
            message("Budget review", "a@b.com", 9, EmailPriority::Normal, true),
            message("Re: Budget review", "a@b.com", 10, EmailPriority::Normal, true),
            message("Fwd: Re: Budget review", "c@d.com", 11, EmailPriority::Normal, true),
        ];
        let facts = compute_facts(&messages);
        assert_eq!(facts.story_arcs.len(), 1);
        assert_eq!(facts.story_arcs[0].1, 3);
    }

    #[test]
    fn two_urgent_messages_within_two_hours_form_a_cluster() {
        let messages = vec![
            message("a", "a@b.com", 9, EmailPriority::Urgent, true),
            message("b", "a@b.com", 10, EmailPriority::High, true),
        ];
        assert_eq!(count_urgency_clusters(&messages), 1);
    }
}
