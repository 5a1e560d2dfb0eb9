use crate::application_port::{ConversationFilter, CoordError};
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

/// Outcome of the direct-pair uniqueness claim. The claim row shares the
/// conversation's transaction, so exactly one caller wins per pair.
pub enum DirectClaim {
    Won,
    Existing(ConversationId),
}

#[async_trait::async_trait]
pub trait ConversationRepo: Send + Sync {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &ConversationRecord,
    ) -> Result<(), CoordError>;

    async fn get(&self, conversation_id: ConversationId)
    -> Result<Option<ConversationRecord>, CoordError>;

    async fn get_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationRecord>, CoordError>;

    /// Inserts the `direct_pair` claim row for the normalized pair. A
    /// duplicate key means another call already owns the pair; the existing
    /// conversation id is returned instead.
    async fn claim_direct_pair_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        pair: &UserPair,
        conversation_id: ConversationId,
    ) -> Result<DirectClaim, CoordError>;

    async fn set_inactive_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError>;

    async fn set_avatar_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        avatar_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError>;

    /// Last-writer-wins bump of the advisory feed sort key.
    async fn touch_activity_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
        summary: &str,
    ) -> Result<(), CoordError>;

    /// Feed query: conversations where `user` holds a live member row and
    /// activity exists, ordered `(last_activity_at DESC, conversation_id
    /// DESC)`, strictly below `after`, at most `limit` rows. Filters are
    /// conjoined before the order/limit.
    async fn list_for_user(
        &self,
        user: UserId,
        limit: u16,
        after: Option<Cursor>,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationRecord>, CoordError>;
}
