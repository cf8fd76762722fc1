//! The external adapter boundary (§6). The core pipeline only ever talks to
//! this trait; a real provider (Gmail, IMAP, ...) lives outside this crate.
//! [`MockConnector`] is an in-memory stand-in used by the scheduler's own
//! tests and by `triage pull` when no real provider is configured.

pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use triage_store::schema::Message;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("message not found: {0}")]
    NotFound(String),
    #[error("transient connector error: {0}")]
    Transient(String),
    #[error("permanent connector error: {0}")]
    Permanent(String),
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectorCapabilities {
    pub supports_push: bool,
    pub supports_labels: bool,
}

/// A page of pulled messages plus the cursor to resume from next time.
#[derive(Debug, Clone)]
pub struct PullResult {
    pub messages: Vec<Message>,
    pub next_since: DateTime<Utc>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn capabilities(&self) -> ConnectorCapabilities;

    async fn authenticate(&self) -> Result<(), ConnectorError>;

    async fn pull(&self, since: DateTime<Utc>, max: usize) -> Result<PullResult, ConnectorError>;

    async fn get_message(&self, external_id: &str) -> Result<Message, ConnectorError>;

    async fn mark_read(&self, external_id: &str, read: bool) -> Result<(), ConnectorError>;

    async fn archive(&self, external_id: &str) -> Result<(), ConnectorError>;

    async fn apply_labels(&self, external_id: &str, add: &[String], remove: &[String]) -> Result<(), ConnectorError>;

    async fn list_labels(&self) -> Result<Vec<String>, ConnectorError>;
}
