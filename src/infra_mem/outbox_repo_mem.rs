use super::store::{lock, MemStore, OutboxRow};
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct MemOutboxRepo {
    store: Arc<MemStore>,
}

impl MemOutboxRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl OutboxRepo for MemOutboxRepo {
    async fn enqueue_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        event: &OutboxEvent,
    ) -> anyhow::Result<()> {
        lock(&self.store.outbox).push(OutboxRow {
            event: event.clone(),
            next_attempt_at: event.created_at,
            delivered_at: None,
            dead_at: None,
            last_error: None,
        });
        Ok(())
    }

    async fn claim_ready_batch_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        now: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<OutboxEvent>> {
        let outbox = lock(&self.store.outbox);

        let mut ready: Vec<&OutboxRow> = outbox
            .iter()
            .filter(|r| r.delivered_at.is_none() && r.dead_at.is_none() && r.next_attempt_at <= now)
            .collect();
        ready.sort_by_key(|r| r.event.created_at);
        ready.truncate(limit as usize);

        Ok(ready.into_iter().map(|r| r.event.clone()).collect())
    }

    async fn mark_delivered_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        delivered_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        for r in lock(&self.store.outbox).iter_mut() {
            if r.event.event_id == event_id {
                r.delivered_at = Some(delivered_at);
            }
        }
        Ok(())
    }

    async fn reschedule_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> anyhow::Result<()> {
        for r in lock(&self.store.outbox).iter_mut() {
            if r.event.event_id == event_id {
                r.event.attempt_count += 1;
                r.next_attempt_at = next_attempt_at;
                r.last_error = Some(last_error.to_string());
            }
        }
        Ok(())
    }

    async fn mark_dead_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        dead_at: DateTime<Utc>,
        last_error: &str,
    ) -> anyhow::Result<()> {
        for r in lock(&self.store.outbox).iter_mut() {
            if r.event.event_id == event_id {
                r.event.attempt_count += 1;
                r.dead_at = Some(dead_at);
                r.last_error = Some(last_error.to_string());
            }
        }
        Ok(())
    }
}
