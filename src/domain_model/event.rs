use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One variant per state transition the core fans out. Serialized form is
/// the broker payload body; consumers dispatch on `type`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum DomainEvent {
    InviteCreated(InviteCreated),
    ConversationJoined(ConversationJoined),
    InviteDeclined(InviteDeclined),
    MemberRemoved(MemberRemoved),
    GroupDissolved(GroupDissolved),
    ConversationCreated(ConversationCreated),
    ConversationAvatarUpdated(ConversationAvatarUpdated),
    MessageCreated(MessageCreated),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteCreated {
    pub invite_id: InviteId,
    pub conversation_id: ConversationId,
    pub conversation_name: Option<String>,
    pub kind: ConversationKind,
    pub sender_id: UserId,
    pub sender_name: String,
    pub receiver_id: UserId,
    pub receiver_name: String,
    pub note: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationJoined {
    pub conversation_id: ConversationId,
    pub conversation_name: Option<String>,
    pub kind: ConversationKind,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteDeclined {
    pub invite_id: InviteId,
    pub conversation_id: ConversationId,
    pub conversation_name: Option<String>,
    pub owner_id: UserId,
    pub user_id: UserId,
    pub declined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberRemoved {
    pub conversation_id: ConversationId,
    pub conversation_name: Option<String>,
    pub user_id: UserId,
    pub removed_at: DateTime<Utc>,
}

/// Carries the full prior member list so notification fan-out is a single
/// broadcast instead of N lookups.
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupDissolved {
    pub conversation_id: ConversationId,
    pub conversation_name: Option<String>,
    pub owner_id: UserId,
    pub member_ids: Vec<UserId>,
    pub dissolved_at: DateTime<Utc>,
}

/// Carries the full initial member-id set for the same reason.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationCreated {
    pub conversation_id: ConversationId,
    pub conversation_name: Option<String>,
    pub kind: ConversationKind,
    pub creator_id: UserId,
    pub member_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationAvatarUpdated {
    pub conversation_id: ConversationId,
    pub avatar_url: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageCreated {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}
