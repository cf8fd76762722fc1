use std::collections::HashMap;

use chrono::{DateTime, Utc};
use triage_config::IndexConfig;
use triage_store::schema::{Message, RelationshipClass, SenderProfile, StrategicClass};

/// Window within which a message counts toward `recentCount` (§4.4).
const RECENT_WINDOW_DAYS: i64 = 30;
const TOP_KEYWORDS: usize = 5;

#[derive(Debug, Clone)]
pub struct SenderAggregate {
    pub address: String,
    pub display_name: Option<String>,
    pub total_count: u64,
    pub recent_count: u64,
    pub keyword_freq: HashMap<String, u32>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl SenderAggregate {
    pub fn new(first_message: &Message) -> Self {
        Self {
            address: first_message.sender.address.to_lowercase(),
            display_name: first_message.sender.display_name.clone(),
            total_count: 0,
            recent_count: 0,
            keyword_freq: HashMap::new(),
            first_seen: first_message.received_at,
            last_seen: first_message.received_at,
        }
    }

    pub fn observe(&mut self, message: &Message, now: DateTime<Utc>) {
        self.total_count += 1;
        if (now - message.received_at).num_days() <= RECENT_WINDOW_DAYS {
            self.recent_count += 1;
        }
        if message.sender.display_name.is_some() {
            self.display_name = message.sender.display_name.clone();
        }
        self.first_seen = self.first_seen.min(message.received_at);
        self.last_seen = self.last_seen.max(message.received_at);

        for word in subject_keywords(&message.subject) {
            *self.keyword_freq.entry(word).or_insert(0) += 1;
        }
    }

    pub fn relationship_class(&self, config: &IndexConfig) -> RelationshipClass {
        let domain = self.address.split('@').nth(1).unwrap_or("");
        config
            .strategic_domains
            .iter()
            .find(|(d, _)| d.eq_ignore_ascii_case(domain))
            .and_then(|(_, class)| parse_relationship_class(class))
            .unwrap_or(RelationshipClass::Unknown)
    }

    pub fn importance_score(&self, config: &IndexConfig) -> f32 {
        let relationship_bonus = relationship_bonus(self.relationship_class(config));
        let vip_bonus = if config.vip_addresses.iter().any(|a| a.eq_ignore_ascii_case(&self.address)) { 20.0 } else { 0.0 };
        let raw = 2.0 * self.total_count as f32 + 5.0 * self.recent_count as f32 + relationship_bonus + vip_bonus;
        raw.clamp(0.0, 100.0)
    }

    pub fn strategic_class(&self, config: &IndexConfig) -> StrategicClass {
        let score = self.importance_score(config);
        let class = self.relationship_class(config);
        use RelationshipClass::*;
        if score >= 80.0 || matches!(class, Founder | Board) {
            StrategicClass::Critical
        } else if score >= 60.0 || matches!(class, Investor | VendorCritical) {
            StrategicClass::High
        } else if score >= 30.0 || matches!(class, Customer | Team) {
            StrategicClass::Medium
        } else {
            StrategicClass::Low
        }
    }

    pub fn to_profile(&self, config: &IndexConfig) -> SenderProfile {
        let mut keywords: Vec<(&String, &u32)> = self.keyword_freq.iter().collect();
        keywords.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        SenderProfile {
            address: self.address.clone(),
            display_name: self.display_name.clone(),
            total_messages: self.total_count,
            recent_messages: self.recent_count,
            relationship_class: self.relationship_class(config),
            importance_score: self.importance_score(config),
            strategic_class: self.strategic_class(config),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            top_keywords: keywords.into_iter().take(TOP_KEYWORDS).map(|(k, _)| k.clone()).collect(),
        }
    }
}

fn relationship_bonus(class: RelationshipClass) -> f32 {
    use RelationshipClass::*;
    match class {
        Founder => 45.0,
        Board => 40.0,
        Investor => 35.0,
        VendorCritical => 30.0,
        Customer => 25.0,
        Team => 20.0,
        VendorImportant => 15.0,
        Advisor | Vendor | Unknown => 0.0,
    }
}

fn parse_relationship_class(s: &str) -> Option<RelationshipClass> {
    use RelationshipClass::*;
    Some(match s.to_uppercase().as_str() {
        "FOUNDER" => Founder,
        "BOARD" => Board,
        "INVESTOR" => Investor,
        "CUSTOMER" => Customer,
        "TEAM" => Team,
        "ADVISOR" => Advisor,
        "VENDOR_CRITICAL" => VendorCritical,
        "VENDOR_IMPORTANT" => VendorImportant,
        "VENDOR" => Vendor,
        _ => return None,
    })
}

const STOPWORDS: &[&str] = &["the", "a", "an", "and", "or", "to", "of", "for", "in", "on", "is", "re", "fwd"];

fn subject_keywords(subject: &str) -> Vec<String> {
    subject
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}
