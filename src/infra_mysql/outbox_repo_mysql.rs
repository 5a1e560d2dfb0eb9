use super::util::downcast;
use crate::domain_port::*;
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::Row;

// Every operation shares a caller-owned transaction, so no pool is held.
#[derive(Default)]
pub struct MySqlOutboxRepo;

impl MySqlOutboxRepo {
    pub fn new() -> Self {
        Self
    }

    fn row_to_event(r: &MySqlRow) -> anyhow::Result<OutboxEvent> {
        let event_type: String = r.get("event_type");
        let receivers: String = r.get("receivers");
        let payload: String = r.get("payload");

        Ok(OutboxEvent {
            event_id: r.get("event_id"),
            event_type: event_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?,
            partition_key: r.get("partition_key"),
            receivers_json: serde_json::from_str(&receivers).context("receivers column")?,
            payload_json: serde_json::from_str(&payload).context("payload column")?,
            attempt_count: r.get::<u32, _>("attempt_count"),
            created_at: r.get("created_at"),
        })
    }
}

#[async_trait::async_trait]
impl OutboxRepo for MySqlOutboxRepo {
    async fn enqueue_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event: &OutboxEvent,
    ) -> anyhow::Result<()> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO outbox_event
  (event_id, event_type, partition_key, receivers, payload, attempt_count,
   created_at, next_attempt_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(event.event_id)
        .bind(event.event_type.as_str())
        .bind(event.partition_key)
        .bind(serde_json::to_string(&event.receivers_json)?)
        .bind(serde_json::to_string(&event.payload_json)?)
        .bind(event.attempt_count)
        .bind(event.created_at)
        .bind(event.created_at)
        .execute(tx.conn())
        .await
        .context("enqueue outbox event")?;

        Ok(())
    }

    async fn claim_ready_batch_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        now: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<OutboxEvent>> {
        let tx = downcast(tx);

        // SKIP LOCKED lets concurrent pumps drain disjoint batches without
        // blocking on each other.
        let rows = sqlx::query(
            r#"
SELECT event_id, event_type, partition_key, receivers, payload,
       attempt_count, created_at
FROM outbox_event
WHERE delivered_at IS NULL AND dead_at IS NULL AND next_attempt_at <= ?
ORDER BY created_at ASC
LIMIT ?
FOR UPDATE SKIP LOCKED
"#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(tx.conn())
        .await
        .context("claim outbox batch")?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn mark_delivered_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        delivered_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let tx = downcast(tx);

        sqlx::query("UPDATE outbox_event SET delivered_at = ? WHERE event_id = ?")
            .bind(delivered_at)
            .bind(event_id)
            .execute(tx.conn())
            .await
            .context("mark outbox event delivered")?;

        Ok(())
    }

    async fn reschedule_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> anyhow::Result<()> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
UPDATE outbox_event
SET attempt_count = attempt_count + 1, next_attempt_at = ?,
    last_error = LEFT(?, 1024)
WHERE event_id = ?
"#,
        )
        .bind(next_attempt_at)
        .bind(last_error)
        .bind(event_id)
        .execute(tx.conn())
        .await
        .context("reschedule outbox event")?;

        Ok(())
    }

    async fn mark_dead_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        dead_at: DateTime<Utc>,
        last_error: &str,
    ) -> anyhow::Result<()> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
UPDATE outbox_event
SET attempt_count = attempt_count + 1, dead_at = ?, last_error = LEFT(?, 1024)
WHERE event_id = ?
"#,
        )
        .bind(dead_at)
        .bind(last_error)
        .bind(event_id)
        .execute(tx.conn())
        .await
        .context("mark outbox event dead")?;

        Ok(())
    }
}
