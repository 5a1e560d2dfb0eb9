use super::store::{below_cursor, lock, MemStore};
use crate::application_port::{CoordError, InviteFilter};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct MemInviteRepo {
    store: Arc<MemStore>,
}

impl MemInviteRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl InviteRepo for MemInviteRepo {
    async fn insert_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        record: &InviteRecord,
    ) -> Result<(), CoordError> {
        let mut invites = lock(&self.store.invites);

        if record.status == InviteStatus::Pending
            && invites.values().any(|i| {
                i.conversation_id == record.conversation_id
                    && i.receiver_id == record.receiver_id
                    && i.status == InviteStatus::Pending
            })
        {
            return Err(CoordError::Conflict("pending invite already exists"));
        }

        invites.insert(record.invite_id, record.clone());
        Ok(())
    }

    async fn has_pending_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        receiver: UserId,
    ) -> Result<bool, CoordError> {
        Ok(lock(&self.store.invites).values().any(|i| {
            i.conversation_id == conversation_id
                && i.receiver_id == receiver
                && i.status == InviteStatus::Pending
        }))
    }

    async fn get_for_receiver_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        invite_id: InviteId,
        receiver: UserId,
    ) -> Result<Option<InviteRecord>, CoordError> {
        Ok(lock(&self.store.invites)
            .get(&invite_id)
            .filter(|i| i.receiver_id == receiver)
            .cloned())
    }

    async fn mark_responded_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        invite_id: InviteId,
        to: InviteStatus,
        responded_at: DateTime<Utc>,
    ) -> Result<u64, CoordError> {
        let mut invites = lock(&self.store.invites);

        match invites.get_mut(&invite_id) {
            Some(i) if i.status == InviteStatus::Pending => {
                i.status = to;
                i.responded_at = Some(responded_at);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_pending_for_conversation_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<(), CoordError> {
        lock(&self.store.invites).retain(|_, i| {
            !(i.conversation_id == conversation_id && i.status == InviteStatus::Pending)
        });
        Ok(())
    }

    async fn list_for_receiver(
        &self,
        receiver: UserId,
        limit: u16,
        after: Option<Cursor>,
        filter: &InviteFilter,
    ) -> Result<Vec<InviteRecord>, CoordError> {
        let mut rows: Vec<InviteRecord> = lock(&self.store.invites)
            .values()
            .filter(|i| i.receiver_id == receiver)
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .filter(|i| {
                filter.keyword.as_ref().is_none_or(|kw| {
                    i.sender_name.contains(kw.as_str())
                        || i.conversation_name
                            .as_ref()
                            .is_some_and(|n| n.contains(kw.as_str()))
                })
            })
            .filter(|i| {
                after
                    .as_ref()
                    .is_none_or(|cur| below_cursor(i.requested_at, i.invite_id.0, cur))
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| (b.requested_at, b.invite_id.0).cmp(&(a.requested_at, a.invite_id.0)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
