use crate::domain_model::{ConversationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct InviteId(pub uuid::Uuid);

impl fmt::Display for InviteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InviteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(InviteId)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InviteStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InviteStatus::Pending)
    }

    /// Pending is the only source state; an invite transitions exactly once.
    pub fn can_transition_to(&self, next: InviteStatus) -> bool {
        matches!(
            (self, next),
            (InviteStatus::Pending, InviteStatus::Accepted)
                | (InviteStatus::Pending, InviteStatus::Rejected)
        )
    }
}

impl FromStr for InviteStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(InviteStatus::Pending),
            "ACCEPTED" => Ok(InviteStatus::Accepted),
            "REJECTED" => Ok(InviteStatus::Rejected),
            other => Err(format!("unknown invite status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteDecision {
    Accept,
    Decline,
}

/// Sender/receiver display fields travel with the row so the invite feed
/// never joins against the identity service. Staleness on profile change
/// is accepted; these are social records, not live mirrors.
#[derive(Debug, Clone, Serialize)]
pub struct InviteRecord {
    pub invite_id: InviteId,
    pub conversation_id: ConversationId,
    pub conversation_name: Option<String>,
    pub sender_id: UserId,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub receiver_id: UserId,
    pub receiver_name: String,
    pub receiver_avatar: Option<String>,
    pub note: Option<String>,
    pub status: InviteStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::InviteStatus::*;

    #[test]
    fn invites_transition_exactly_once() {
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        for terminal in [Accepted, Rejected] {
            assert!(terminal.is_terminal());
            for next in [Pending, Accepted, Rejected] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
