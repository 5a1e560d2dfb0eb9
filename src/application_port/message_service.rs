use crate::application_port::CoordError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait MessageService: Send + Sync {
    /// Persists the message, bumps the conversation's advisory
    /// `last_activity_*` fields, and enqueues `MessageCreated`, all in one
    /// transaction.
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: &str,
    ) -> Result<MessageRecord, CoordError>;

    /// Feed: member-only history ordered `(created_at DESC, message_id DESC)`.
    async fn get_history(
        &self,
        user: UserId,
        conversation_id: ConversationId,
        page_size: PageSize,
        before: Option<Cursor>,
    ) -> Result<Page<MessageRecord>, CoordError>;
}
