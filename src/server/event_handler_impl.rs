use crate::application_port::{ConversationService, CoordError};
use crate::domain_model::FileUploadedNotice;
use crate::domain_port::SeenLedger;
use crate::server::{EventHandler, HandleOutcome};
use serde::Deserialize;
use std::sync::Arc;

/// Envelope the object-storage service wraps around completion notices.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadNoticeEnvelope {
    event_id: String,
    body: FileUploadedNotice,
}

/// Consumes upload-completion notices. Delivery is at-least-once, so the
/// seen ledger filters redeliveries before the service runs; the service
/// itself tolerates duplicates that slip past the ledger.
pub struct UploadNoticeHandler {
    seen_ledger: Arc<dyn SeenLedger>,
    conversation_service: Arc<dyn ConversationService>,
}

impl UploadNoticeHandler {
    pub fn new(
        seen_ledger: Arc<dyn SeenLedger>,
        conversation_service: Arc<dyn ConversationService>,
    ) -> Self {
        Self {
            seen_ledger,
            conversation_service,
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for UploadNoticeHandler {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<HandleOutcome> {
        let envelope: UploadNoticeEnvelope = match serde_json::from_slice(payload) {
            Ok(e) => e,
            Err(e) => {
                // poison message; committing skips it for good
                tracing::warn!("undecodable upload notice dropped: {e}");
                return Ok(HandleOutcome::Commit);
            }
        };

        if !self.seen_ledger.first_sighting(&envelope.event_id).await? {
            tracing::debug!(event_id = %envelope.event_id, "duplicate notice skipped");
            return Ok(HandleOutcome::Commit);
        }

        match self
            .conversation_service
            .apply_upload_completed(&envelope.body)
            .await
        {
            Ok(()) => Ok(HandleOutcome::Commit),
            // storage faults are transient; leave the offset so the notice
            // comes around again
            Err(CoordError::Store(e)) => {
                tracing::warn!(event_id = %envelope.event_id, "upload notice deferred: {e}");
                Ok(HandleOutcome::Retry)
            }
            Err(e) => {
                tracing::warn!(event_id = %envelope.event_id, "upload notice rejected: {e}");
                Ok(HandleOutcome::Commit)
            }
        }
    }
}
