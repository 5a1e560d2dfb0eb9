use crate::domain_port::SeenLedger;
use dashmap::DashSet;

/// Process-local dedup ledger, unbounded. Only suitable for the mem
/// backend and tests.
#[derive(Default)]
pub struct MemSeenLedger {
    seen: DashSet<String>,
}

impl MemSeenLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SeenLedger for MemSeenLedger {
    async fn first_sighting(&self, event_id: &str) -> anyhow::Result<bool> {
        Ok(self.seen.insert(event_id.to_string()))
    }
}
