use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use triage_store::schema::Message;

use crate::{Connector, ConnectorCapabilities, ConnectorError, PullResult};

/// In-memory connector backed by a fixed inbox, useful for tests and for
/// running the pipeline without a configured real provider.
pub struct MockConnector {
    inbox: Mutex<Vec<Message>>,
    labels: Mutex<HashSet<String>>,
}

impl MockConnector {
    pub fn new(inbox: Vec<Message>) -> Self {
        Self { inbox: Mutex::new(inbox), labels: Mutex::new(HashSet::new()) }
    }

    pub fn seed(&self, message: Message) {
        self.inbox.lock().expect("mock connector lock poisoned").push(message);
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities { supports_push: false, supports_labels: true }
    }

    async fn authenticate(&self) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn pull(&self, since: DateTime<Utc>, max: usize) -> Result<PullResult, ConnectorError> {
        let inbox = self.inbox.lock().expect("mock connector lock poisoned");
        let mut messages: Vec<Message> = inbox.iter().filter(|m| m.received_at > since).cloned().collect();
        messages.sort_by_key(|m| m.received_at);
        messages.truncate(max);
        let next_since = messages.last().map(|m| m.received_at).unwrap_or(since);
        Ok(PullResult { messages, next_since })
    }

    async fn get_message(&self, external_id: &str) -> Result<Message, ConnectorError> {
        let inbox = self.inbox.lock().expect("mock connector lock poisoned");
        inbox
            .iter()
            .find(|m| m.external_id == external_id)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(external_id.to_string()))
    }

    async fn mark_read(&self, external_id: &str, read: bool) -> Result<(), ConnectorError> {
        let mut inbox = self.inbox.lock().expect("mock connector lock poisoned");
        let message = inbox
            .iter_mut()
            .find(|m| m.external_id == external_id)
            .ok_or_else(|| ConnectorError::NotFound(external_id.to_string()))?;
        message.is_read = read;
        Ok(())
    }

    async fn archive(&self, external_id: &str) -> Result<(), ConnectorError> {
        let mut inbox = self.inbox.lock().expect("mock connector lock poisoned");
        let before = inbox.len();
        inbox.retain(|m| m.external_id != external_id);
        if inbox.len() == before {
            return Err(ConnectorError::NotFound(external_id.to_string()));
        }
        Ok(())
    }

    async fn apply_labels(&self, external_id: &str, add: &[String], remove: &[String]) -> Result<(), ConnectorError> {
        let mut inbox = self.inbox.lock().expect("mock connector lock poisoned");
        let message = inbox
            .iter_mut()
            .find(|m| m.external_id == external_id)
            .ok_or_else(|| ConnectorError::NotFound(external_id.to_string()))?;
        for label in add {
            message.provider_labels.insert(label.clone());
        }
        for label in remove {
            message.provider_labels.remove(label);
        }
        let mut labels = self.labels.lock().expect("mock connector lock poisoned");
        labels.extend(add.iter().cloned());
        Ok(())
    }

    async fn list_labels(&self) -> Result<Vec<String>, ConnectorError> {
        Ok(self.labels.lock().expect("mock connector lock poisoned").iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet as Set;
    use triage_store::schema::{EmailCategory, EmailPriority, SenderAddress};
    use uuid::Uuid;

    fn sample(external_id: &str, received_at: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            thread_id: "t1".to_string(),
            sender: SenderAddress { address: "a@b.com".to_string(), display_name: None },
            recipients: vec!["me@example.com".to_string()],
            subject: "hi".to_string(),
            body_text: "body".to_string(),
            body_html: None,
            sent_at: received_at,
            received_at,
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

    #[tokio::test]
    async fn pull_only_returns_messages_after_since_and_advances_cursor() {
        let t0 = Utc::now() - chrono::Duration::days(1);
        let t1 = Utc::now();
        let connector = MockConnector::new(vec![sample("old", t0), sample("new", t1)]);
        let result = connector.pull(t0, 10).await.unwrap();
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].external_id, "new");
        assert_eq!(result.next_since, t1);
    }

    #[tokio::test]
    async fn apply_labels_then_list_labels_reflects_additions() {
        let connector = MockConnector::new(vec![sample("m1", Utc::now())]);
        connector.apply_labels("m1", &["vip".to_string()], &[]).await.unwrap();
        let labels = connector.list_labels().await.unwrap();
        assert_eq!(labels, vec!["vip".to_string()]);
    }

    #[tokio::test]
    async fn archive_missing_message_errors() {
        let connector = MockConnector::new(Vec::new());
        let err = connector.archive("missing").await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound(_)));
    }
}
