use super::store::{below_cursor, lock, MemStore};
use crate::application_port::{ConversationFilter, CoordError};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct MemConversationRepo {
    store: Arc<MemStore>,
}

impl MemConversationRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ConversationRepo for MemConversationRepo {
    async fn insert_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        record: &ConversationRecord,
    ) -> Result<(), CoordError> {
        lock(&self.store.conversations).insert(record.conversation_id, record.clone());
        Ok(())
    }

    async fn get(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationRecord>, CoordError> {
        Ok(lock(&self.store.conversations).get(&conversation_id).cloned())
    }

    async fn get_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationRecord>, CoordError> {
        Ok(lock(&self.store.conversations).get(&conversation_id).cloned())
    }

    async fn claim_direct_pair_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        pair: &UserPair,
        conversation_id: ConversationId,
    ) -> Result<DirectClaim, CoordError> {
        let mut pairs = lock(&self.store.direct_pairs);
        match pairs.get(&(pair.min(), pair.max())) {
            Some(existing) => Ok(DirectClaim::Existing(*existing)),
            None => {
                pairs.insert((pair.min(), pair.max()), conversation_id);
                Ok(DirectClaim::Won)
            }
        }
    }

    async fn set_inactive_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        if let Some(c) = lock(&self.store.conversations).get_mut(&conversation_id) {
            c.active = false;
            c.updated_at = at;
        }
        Ok(())
    }

    async fn set_avatar_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        avatar_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        if let Some(c) = lock(&self.store.conversations).get_mut(&conversation_id) {
            c.avatar_url = Some(avatar_url.to_string());
            c.updated_at = at;
        }
        Ok(())
    }

    async fn touch_activity_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
        summary: &str,
    ) -> Result<(), CoordError> {
        if let Some(c) = lock(&self.store.conversations).get_mut(&conversation_id) {
            c.last_activity_at = Some(at);
            c.last_activity_summary = Some(summary.chars().take(255).collect());
            c.updated_at = at;
        }
        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        limit: u16,
        after: Option<Cursor>,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationRecord>, CoordError> {
        let member_of: Vec<ConversationId> = lock(&self.store.members)
            .values()
            .filter(|m| m.user_id == user && m.status.is_live())
            .map(|m| m.conversation_id)
            .collect();

        let mut rows: Vec<ConversationRecord> = lock(&self.store.conversations)
            .values()
            .filter(|c| member_of.contains(&c.conversation_id))
            .filter(|c| c.last_activity_at.is_some())
            .filter(|c| filter.kind.is_none_or(|k| c.kind == k))
            .filter(|c| {
                filter.keyword.as_ref().is_none_or(|kw| {
                    c.name.as_ref().is_some_and(|n| n.contains(kw.as_str()))
                })
            })
            .filter(|c| {
                after.as_ref().is_none_or(|cur| {
                    c.last_activity_at
                        .is_some_and(|ts| below_cursor(ts, c.conversation_id.0, cur))
                })
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            (b.last_activity_at, b.conversation_id.0).cmp(&(a.last_activity_at, a.conversation_id.0))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
