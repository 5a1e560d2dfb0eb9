use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct EventId(pub uuid::Uuid);

/// One broker topic per event kind; relative order is only guaranteed
/// within a partition key (conversation id, or user id for per-user
/// notices).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "invite.created")]
    InviteCreated,
    #[serde(rename = "conversation.joined")]
    ConversationJoined,
    #[serde(rename = "invite.declined")]
    InviteDeclined,
    #[serde(rename = "member.removed")]
    MemberRemoved,
    #[serde(rename = "group.dissolved")]
    GroupDissolved,
    #[serde(rename = "conversation.created")]
    ConversationCreated,
    #[serde(rename = "conversation.avatar.updated")]
    ConversationAvatarUpdated,
    #[serde(rename = "message.created")]
    MessageCreated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::InviteCreated => "invite.created",
            EventType::ConversationJoined => "conversation.joined",
            EventType::InviteDeclined => "invite.declined",
            EventType::MemberRemoved => "member.removed",
            EventType::GroupDissolved => "group.dissolved",
            EventType::ConversationCreated => "conversation.created",
            EventType::ConversationAvatarUpdated => "conversation.avatar.updated",
            EventType::MessageCreated => "message.created",
        }
    }

    pub fn topic(&self, prefix: &str) -> String {
        format!("{prefix}.{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invite.created" => Ok(EventType::InviteCreated),
            "conversation.joined" => Ok(EventType::ConversationJoined),
            "invite.declined" => Ok(EventType::InviteDeclined),
            "member.removed" => Ok(EventType::MemberRemoved),
            "group.dissolved" => Ok(EventType::GroupDissolved),
            "conversation.created" => Ok(EventType::ConversationCreated),
            "conversation.avatar.updated" => Ok(EventType::ConversationAvatarUpdated),
            "message.created" => Ok(EventType::MessageCreated),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub event_id: EventId,
    pub event_type: EventType,
    /// Conversation id, or user id for per-user notices. Falls back to the
    /// event id when absent so keyless events still spread across
    /// partitions.
    pub partition_key: Option<uuid::Uuid>,

    pub receivers_json: serde_json::Value,
    pub payload_json: serde_json::Value,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn new(
        event_type: EventType,
        partition_key: Option<uuid::Uuid>,
        receivers: Vec<UserId>,
        payload: &DomainEvent,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            event_id: EventId(uuid::Uuid::new_v4()),
            event_type,
            partition_key,
            receivers_json: serde_json::to_value(receivers)?,
            payload_json: serde_json::to_value(payload)?,
            attempt_count: 0,
            created_at: Utc::now(),
        })
    }
}

#[async_trait::async_trait]
pub trait OutboxRepo: Send + Sync {
    /// Shares the transaction of the state change it announces; the event
    /// becomes visible to the notifier only after that change durably
    /// commits.
    async fn enqueue_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event: &OutboxEvent,
    ) -> anyhow::Result<()>;

    async fn claim_ready_batch_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        now: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<OutboxEvent>>;

    async fn mark_delivered_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        delivered_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn reschedule_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> anyhow::Result<()>;

    /// Dead-letter parking after retries are exhausted. The originating
    /// state change is already committed and stays committed.
    async fn mark_dead_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        event_id: EventId,
        dead_at: DateTime<Utc>,
        last_error: &str,
    ) -> anyhow::Result<()>;
}
