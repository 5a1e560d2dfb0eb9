/// Consumer-side at-least-once dedup: a TTL'd set of event ids. `true`
/// means this is the first sighting and the event should be processed;
/// `false` means a redelivery. The broker gives no exactly-once guarantee,
/// so handlers stay idempotent even when the ledger says "first".
#[async_trait::async_trait]
pub trait SeenLedger: Send + Sync {
    async fn first_sighting(&self, event_id: &str) -> anyhow::Result<bool>;
}
