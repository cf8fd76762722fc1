#![cfg(test)]

use std::collections::HashSet;
use chrono::Utc;
use triage_store::schema::{EmailCategory, EmailPriority, Message, SenderAddress};
use uuid::Uuid;

pub fn sample_message(address: &str, subject: &str, body: &str) -> Message {
    Message {
        id: Uuid::new_v4(),
        external_id: Uuid::new_v4().to_string(),
        thread_id: "thread-1".to_string(),
        sender: SenderAddress { address: address.to_string(), display_name: None },
        recipients: vec!["me@example.com".to_string()],
        subject: subject.to_string(),
        body_text: body.to_string(),
        body_html: None,
        sent_at: Utc::now(),
        received_at: Utc::now(),
        is_read: false,
        is_flagged: false,
        category: EmailCategory::Primary,
        priority: EmailPriority::Normal,
        tags: HashSet::new(),
        provider_labels: HashSet::new(),
        processing_stamps: HashSet::new(),
        has_attachments: false,
        attachment_count: 0,
        category_inferred: false,
    }
}
