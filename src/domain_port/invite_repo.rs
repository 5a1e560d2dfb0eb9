use crate::application_port::{CoordError, InviteFilter};
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait InviteRepo: Send + Sync {
    /// Inserts a Pending invite. The pending unique index makes the
    /// one-pending-per-(conversation, receiver) rule hold under races; a
    /// duplicate key surfaces as `Conflict`.
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &InviteRecord,
    ) -> Result<(), CoordError>;

    /// Precondition probe for the explicit, ordered check. The unique index
    /// remains the concurrent backstop.
    async fn has_pending_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        receiver: UserId,
    ) -> Result<bool, CoordError>;

    async fn get_for_receiver_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        invite_id: InviteId,
        receiver: UserId,
    ) -> Result<Option<InviteRecord>, CoordError>;

    /// Guarded terminal flip: `WHERE status = 'PENDING'`. Zero affected rows
    /// means the invite was already responded to.
    async fn mark_responded_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        invite_id: InviteId,
        to: InviteStatus,
        responded_at: DateTime<Utc>,
    ) -> Result<u64, CoordError>;

    /// Dissolution makes pending invites moot; they are deleted, not
    /// rejected.
    async fn delete_pending_for_conversation_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<(), CoordError>;

    /// Feed query, `(requested_at DESC, invite_id DESC)` strictly below
    /// `after`, at most `limit` rows, filters conjoined before order/limit.
    async fn list_for_receiver(
        &self,
        receiver: UserId,
        limit: u16,
        after: Option<Cursor>,
        filter: &InviteFilter,
    ) -> Result<Vec<InviteRecord>, CoordError>;
}
