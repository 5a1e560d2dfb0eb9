use crate::domain_port::*;
use crate::server::EventPublisher;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BATCH_SIZE: u32 = 256;
const IDLE_SLEEP: Duration = Duration::from_millis(200);
const MAX_ATTEMPTS: u32 = 8;

/// Outbox pump. Claims due events under `FOR UPDATE SKIP LOCKED`
/// semantics, publishes each to its kind's topic, and records the outcome
/// in the same claiming transaction. Failed events back off per attempt
/// and park in the dead-letter state once attempts run out; the state
/// change that produced them stays committed either way.
pub struct Notifier {
    tx_manager: Arc<dyn TxManager>,
    outbox_repo: Arc<dyn OutboxRepo>,
    event_publisher: Arc<dyn EventPublisher>,
    topic_prefix: String,
    cancellation_token: CancellationToken,
}

impl Notifier {
    pub fn new(
        tx_manager: Arc<dyn TxManager>,
        outbox_repo: Arc<dyn OutboxRepo>,
        event_publisher: Arc<dyn EventPublisher>,
        topic_prefix: &str,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            tx_manager,
            outbox_repo,
            event_publisher,
            topic_prefix: topic_prefix.to_owned(),
            cancellation_token,
        }
    }

    fn build_envelope(
        event_id: EventId,
        receivers_json: &serde_json::Value,
        payload_json: &serde_json::Value,
    ) -> anyhow::Result<Vec<u8>> {
        let envelope = json!({
            "eventId": event_id.0.to_string(),
            "receivers": receivers_json,
            "body": payload_json,
        });

        Ok(serde_json::to_vec(&envelope)?)
    }

    fn backoff(attempt_count: u32) -> chrono::Duration {
        // 2s, 4s, 8s, ... capped at ~4 minutes
        let exp = attempt_count.min(7);
        chrono::Duration::seconds(2i64 << exp)
    }

    pub async fn tick_once(&self) -> anyhow::Result<bool> {
        let mut tx = self.tx_manager.begin().await?;

        let now = Utc::now();
        let batch = self
            .outbox_repo
            .claim_ready_batch_in_tx(&mut *tx, now, BATCH_SIZE)
            .await?;

        if batch.is_empty() {
            tx.commit().await?;
            return Ok(false);
        }

        for event in &batch {
            // Keyless events still need a stable partition assignment.
            let key = event.partition_key.unwrap_or(event.event_id.0);
            let topic = event.event_type.topic(&self.topic_prefix);
            let payload =
                Self::build_envelope(event.event_id, &event.receivers_json, &event.payload_json)?;

            match self
                .event_publisher
                .publish(&topic, key.as_bytes(), &payload)
                .await
            {
                Ok(()) => {
                    self.outbox_repo
                        .mark_delivered_in_tx(&mut *tx, event.event_id, Utc::now())
                        .await?;
                }
                Err(e) if event.attempt_count + 1 >= MAX_ATTEMPTS => {
                    tracing::error!(
                        event_id = %event.event_id.0,
                        event_type = event.event_type.as_str(),
                        "event exhausted delivery attempts: {e:#}"
                    );
                    self.outbox_repo
                        .mark_dead_in_tx(&mut *tx, event.event_id, Utc::now(), &format!("{e:#}"))
                        .await?;
                }
                Err(e) => {
                    let next = Utc::now() + Self::backoff(event.attempt_count);
                    self.outbox_repo
                        .reschedule_in_tx(&mut *tx, event.event_id, next, &format!("{e:#}"))
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("notifier shutting down...");
                    break;
                }
                result = self.tick_once() => {
                    match result {
                        Ok(true) => {}
                        Ok(false) => tokio::time::sleep(IDLE_SLEEP).await,
                        Err(e) => {
                            tracing::error!("notifier error: {e:#}");
                            tokio::time::sleep(IDLE_SLEEP).await;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
