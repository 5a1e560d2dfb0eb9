use super::store::{below_cursor, lock, MemStore};
use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

pub struct MemMessageRepo {
    store: Arc<MemStore>,
}

impl MemMessageRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl MessageRepo for MemMessageRepo {
    async fn insert_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        record: &MessageRecord,
    ) -> Result<(), CoordError> {
        lock(&self.store.messages).push(record.clone());
        Ok(())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: u16,
        before: Option<Cursor>,
    ) -> Result<Vec<MessageRecord>, CoordError> {
        let mut rows: Vec<MessageRecord> = lock(&self.store.messages)
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| {
                before
                    .as_ref()
                    .is_none_or(|cur| below_cursor(m.created_at, m.message_id.0, cur))
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| (b.created_at, b.message_id.0).cmp(&(a.created_at, a.message_id.0)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
