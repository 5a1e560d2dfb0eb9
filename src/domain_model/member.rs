use crate::domain_model::{ConversationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct MemberId(pub uuid::Uuid);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberStatus {
    Owner,
    Member,
    Removed,
    Outed,
}

impl MemberStatus {
    /// Owner and Member are the only statuses counted as "currently in".
    pub fn is_live(&self) -> bool {
        matches!(self, MemberStatus::Owner | MemberStatus::Member)
    }

    /// Allowed-edge table. Removed/Outed are terminal for the row;
    /// re-entry happens through a fresh row, never by resurrecting this one.
    pub fn can_transition_to(&self, next: MemberStatus) -> bool {
        matches!(
            (self, next),
            (MemberStatus::Owner, MemberStatus::Removed)
                | (MemberStatus::Member, MemberStatus::Removed)
                | (MemberStatus::Member, MemberStatus::Outed)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberRecord {
    pub member_id: MemberId,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub status: MemberStatus,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::MemberStatus::*;

    #[test]
    fn terminal_rows_stay_terminal() {
        for terminal in [Removed, Outed] {
            for next in [Owner, Member, Removed, Outed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn owners_cannot_out_themselves() {
        assert!(!Owner.can_transition_to(Outed));
        assert!(Owner.can_transition_to(Removed));
        assert!(Member.can_transition_to(Outed));
        assert!(Member.can_transition_to(Removed));
    }
}
