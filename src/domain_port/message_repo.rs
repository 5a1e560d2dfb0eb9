use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait MessageRepo: Send + Sync {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &MessageRecord,
    ) -> Result<(), CoordError>;

    /// History feed, `(created_at DESC, message_id DESC)` strictly below
    /// `before`, at most `limit` rows.
    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: u16,
        before: Option<Cursor>,
    ) -> Result<Vec<MessageRecord>, CoordError>;
}
