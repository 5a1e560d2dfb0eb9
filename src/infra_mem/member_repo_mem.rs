use super::store::{lock, MemStore};
use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct MemMemberRepo {
    store: Arc<MemStore>,
}

impl MemMemberRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl MemberRepo for MemMemberRepo {
    async fn insert_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        record: &MemberRecord,
    ) -> Result<(), CoordError> {
        let mut members = lock(&self.store.members);

        if record.status.is_live()
            && members.values().any(|m| {
                m.conversation_id == record.conversation_id
                    && m.user_id == record.user_id
                    && m.status.is_live()
            })
        {
            return Err(CoordError::Conflict("user already has a live membership"));
        }

        members.insert(record.member_id, record.clone());
        Ok(())
    }

    async fn get_live(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<MemberRecord>, CoordError> {
        Ok(lock(&self.store.members)
            .values()
            .find(|m| {
                m.conversation_id == conversation_id && m.user_id == user_id && m.status.is_live()
            })
            .cloned())
    }

    async fn get_live_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<MemberRecord>, CoordError> {
        self.get_live(conversation_id, user_id).await
    }

    async fn list_live_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<Vec<MemberRecord>, CoordError> {
        let mut rows: Vec<MemberRecord> = lock(&self.store.members)
            .values()
            .filter(|m| m.conversation_id == conversation_id && m.status.is_live())
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.joined_at);
        Ok(rows)
    }

    async fn transition_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        member_id: MemberId,
        from: MemberStatus,
        to: MemberStatus,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        let mut members = lock(&self.store.members);

        match members.get_mut(&member_id) {
            Some(m) if m.status == from => {
                m.status = to;
                m.updated_at = at;
                Ok(())
            }
            _ => Err(CoordError::InvalidState("member status changed concurrently")),
        }
    }

    async fn remove_all_live_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        for m in lock(&self.store.members).values_mut() {
            if m.conversation_id == conversation_id && m.status.is_live() {
                m.status = MemberStatus::Removed;
                m.updated_at = at;
            }
        }
        Ok(())
    }
}
