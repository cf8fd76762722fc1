//! Cross-message aggregates (§4.4): sender index, thread index, contact
//! graph. Readers observe an atomically published snapshot; refresh is
//! single-writer, either incremental (fold a batch in) or a full rebuild.

pub mod contacts;
pub mod sender;
pub mod thread;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use triage_config::IndexConfig;
use triage_store::schema::{Message, SenderProfile, ThreadProfile};

pub use contacts::ContactStrength;
pub use sender::SenderAggregate;
pub use thread::ThreadAggregate;

#[derive(Debug, Clone, Default)]
struct Snapshot {
    senders: HashMap<String, SenderAggregate>,
    threads: HashMap<String, ThreadAggregate>,
}

pub struct IntelligenceIndex {
    config: IndexConfig,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl IntelligenceIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self { config, snapshot: RwLock::new(Arc::new(Snapshot::default())) }
    }

    /// Fold `messages` into the existing aggregates without re-reading
    /// history (§4.4 "Refresh policy ... incremental").
    pub fn refresh_incremental(&self, messages: &[Message]) {
        let mut next = (**self.snapshot.read().expect("index snapshot lock poisoned")).clone();
        fold_messages(&mut next, messages);
        *self.snapshot.write().expect("index snapshot lock poisoned") = Arc::new(next);
    }

    /// Discard all aggregates and rebuild from the full message set.
    pub fn rebuild_full(&self, messages: &[Message]) {
        let mut next = Snapshot::default();
        fold_messages(&mut next, messages);
        *self.snapshot.write().expect("index snapshot lock poisoned") = Arc::new(next);
    }

    pub fn sender_profile(&self, address: &str) -> Option<SenderProfile> {
        let snapshot = self.snapshot.read().expect("index snapshot lock poisoned");
        snapshot.senders.get(&address.to_lowercase()).map(|agg| agg.to_profile(&self.config))
    }

    /// Importance score in `[0, 100]` for `address`, or the index's
    /// no-history default (§4.3.4: "otherwise 0.4 with domain heuristics" is
    /// the *analyzer's* fallback; the index itself reports `None`).
    pub fn sender_importance(&self, address: &str) -> Option<f32> {
        let snapshot = self.snapshot.read().expect("index snapshot lock poisoned");
        snapshot.senders.get(&address.to_lowercase()).map(|agg| agg.importance_score(&self.config))
    }

    pub fn thread_profile(&self, thread_id: &str) -> Option<ThreadProfile> {
        let snapshot = self.snapshot.read().expect("index snapshot lock poisoned");
        snapshot.threads.get(thread_id).map(|agg| agg.to_profile(thread_id))
    }

    /// Classify a domain via the static strategic-domains map, independent of
    /// any observed message history (§4.3.2 fallback path).
    pub fn classify_domain(&self, domain: &str) -> triage_store::schema::RelationshipClass {
        use triage_store::schema::RelationshipClass::*;
        self.config
            .strategic_domains
            .iter()
            .find(|(d, _)| d.eq_ignore_ascii_case(domain))
            .and_then(|(_, class)| match class.to_uppercase().as_str() {
                "FOUNDER" => Some(Founder),
                "BOARD" => Some(Board),
                "INVESTOR" => Some(Investor),
                "CUSTOMER" => Some(Customer),
                "TEAM" => Some(Team),
                "ADVISOR" => Some(Advisor),
                "VENDOR_CRITICAL" => Some(VendorCritical),
                "VENDOR_IMPORTANT" => Some(VendorImportant),
                "VENDOR" => Some(Vendor),
                _ => None,
            })
            .unwrap_or(Unknown)
    }

    pub fn contact_strength(&self, address: &str) -> ContactStrength {
        let snapshot = self.snapshot.read().expect("index snapshot lock poisoned");
        match snapshot.senders.get(&address.to_lowercase()) {
            Some(agg) => contacts::strength_for_count(agg.total_count),
            None => ContactStrength::New,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

fn fold_messages(snapshot: &mut Snapshot, messages: &[Message]) {
    let now = Utc::now();
    for message in messages {
        let key = message.sender.address.to_lowercase();
        let agg = snapshot.senders.entry(key).or_insert_with(|| SenderAggregate::new(message));
        agg.observe(message, now);

        let thread = snapshot.threads.entry(message.thread_id.clone()).or_insert_with(ThreadAggregate::default);
        thread.observe(message);
    }
}
