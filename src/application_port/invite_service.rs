use crate::application_port::CoordError;
use crate::domain_model::*;

#[derive(Debug, Clone, Default)]
pub struct InviteFilter {
    pub status: Option<InviteStatus>,
    /// Matched against sender name and conversation name.
    pub keyword: Option<String>,
}

#[async_trait::async_trait]
pub trait InviteService: Send + Sync {
    /// Creates a Pending invite. Precondition order, first failure wins:
    /// conversation exists / active and unlocked / receiver not already in /
    /// no Pending invite for the pair / no block either direction / sender
    /// holds Owner. Enqueues `InviteCreated` in the same transaction.
    async fn create_invite(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        receiver: UserId,
        note: Option<String>,
    ) -> Result<InviteRecord, CoordError>;

    /// Terminal transition, receiver-only. Accept atomically creates the
    /// fresh Member row with the invite's flip to Accepted.
    async fn respond_to_invite(
        &self,
        invite_id: InviteId,
        receiver: UserId,
        decision: InviteDecision,
    ) -> Result<InviteRecord, CoordError>;

    /// Feed: invites addressed to `receiver`, ordered
    /// `(requested_at DESC, invite_id DESC)`.
    async fn list_invites(
        &self,
        receiver: UserId,
        page_size: PageSize,
        after: Option<Cursor>,
        filter: InviteFilter,
    ) -> Result<Page<InviteRecord>, CoordError>;
}
