use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait MemberRepo: Send + Sync {
    /// Inserts a fresh membership row. The live-row unique index turns a
    /// concurrent double-join into `Conflict`.
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &MemberRecord,
    ) -> Result<(), CoordError>;

    async fn get_live(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<MemberRecord>, CoordError>;

    async fn get_live_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<MemberRecord>, CoordError>;

    async fn list_live_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<Vec<MemberRecord>, CoordError>;

    /// Guarded status edge: the UPDATE carries `WHERE status = from`, so a
    /// row observed terminal can never be flipped back. Zero affected rows
    /// is `InvalidState`.
    async fn transition_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        member_id: MemberId,
        from: MemberStatus,
        to: MemberStatus,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError>;

    /// Dissolution sweep: every live row in the conversation → Removed.
    async fn remove_all_live_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError>;
}
