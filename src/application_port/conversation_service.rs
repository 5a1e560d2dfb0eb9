use crate::application_port::CoordError;
use crate::domain_model::*;

#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub kind: Option<ConversationKind>,
    pub keyword: Option<String>,
}

#[async_trait::async_trait]
pub trait ConversationService: Send + Sync {
    /// Idempotent: if an active, unlocked Direct conversation for the pair
    /// already exists (or another call wins the race), returns its id
    /// instead of erroring. Safe to retry.
    async fn create_direct(
        &self,
        me: UserId,
        other: UserId,
    ) -> Result<ConversationId, CoordError>;

    /// Creates the conversation plus the creator's Owner row, then one
    /// Pending invite per initial member. Public requires the admin role.
    async fn create_group(
        &self,
        creator: UserId,
        name: &str,
        kind: ConversationKind,
        initial_member_ids: Vec<UserId>,
    ) -> Result<ConversationRecord, CoordError>;

    /// Owner-only. Target's live Member row becomes Removed.
    async fn remove_member(
        &self,
        conversation_id: ConversationId,
        acting_owner: UserId,
        target: UserId,
    ) -> Result<(), CoordError>;

    /// Self-service: caller's Member row becomes Outed. Owners cannot leave.
    async fn leave_conversation(
        &self,
        conversation_id: ConversationId,
        user: UserId,
    ) -> Result<(), CoordError>;

    /// Owner-only. Deactivates the conversation, removes every current
    /// member, deletes Pending invites, emits one `GroupDissolved` carrying
    /// the full prior member list.
    async fn dissolve(
        &self,
        conversation_id: ConversationId,
        acting_owner: UserId,
    ) -> Result<(), CoordError>;

    /// Phase 1 of the avatar flow: issue a handle from the object-storage
    /// collaborator and record the Pending intent.
    async fn request_avatar_upload(
        &self,
        conversation_id: ConversationId,
        actor: UserId,
        file_name: &str,
        content_type: &str,
        size_bytes: u64,
    ) -> Result<UploadHandle, CoordError>;

    /// Phase 2, driven by the at-least-once completion consumer. Idempotent;
    /// silently discards notices for foreign business types or for
    /// conversations dissolved between phases.
    async fn apply_upload_completed(
        &self,
        notice: &FileUploadedNotice,
    ) -> Result<(), CoordError>;

    /// Feed: conversations where `user` holds a live row, ordered
    /// `(last_activity_at DESC, conversation_id DESC)`.
    async fn list_conversations(
        &self,
        user: UserId,
        page_size: PageSize,
        after: Option<Cursor>,
        filter: ConversationFilter,
    ) -> Result<Page<ConversationRecord>, CoordError>;
}
