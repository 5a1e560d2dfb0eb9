use super::util::downcast;
use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlMessageRepo {
    pool: MySqlPool,
}

impl MySqlMessageRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_record(r: &MySqlRow) -> MessageRecord {
        MessageRecord {
            message_id: r.get("message_id"),
            conversation_id: r.get("conversation_id"),
            sender_id: r.get("sender_id"),
            sender_name: r.get("sender_name"),
            sender_avatar: r.get("sender_avatar"),
            content: r.get("content"),
            created_at: r.get("created_at"),
        }
    }
}

const SELECT_COLUMNS: &str = r#"
message_id, conversation_id, sender_id, sender_name, sender_avatar,
content, created_at
"#;

#[async_trait::async_trait]
impl MessageRepo for MySqlMessageRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &MessageRecord,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO message
  (message_id, conversation_id, sender_id, sender_name, sender_avatar,
   content, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(record.message_id)
        .bind(record.conversation_id)
        .bind(record.sender_id)
        .bind(&record.sender_name)
        .bind(&record.sender_avatar)
        .bind(&record.content)
        .bind(record.created_at)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("insert message", e))?;

        Ok(())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: u16,
        before: Option<Cursor>,
    ) -> Result<Vec<MessageRecord>, CoordError> {
        let rows = if let Some(cursor) = before {
            sqlx::query(&format!(
                r#"
SELECT {SELECT_COLUMNS}
FROM message
WHERE conversation_id = ?
  AND (created_at < ? OR (created_at = ? AND message_id < ?))
ORDER BY created_at DESC, message_id DESC
LIMIT ?
"#
            ))
            .bind(conversation_id)
            .bind(cursor.sort_ts)
            .bind(cursor.sort_ts)
            .bind(MessageId(cursor.tie_break))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoordError::store("list messages (before)", e))?
        } else {
            sqlx::query(&format!(
                r#"
SELECT {SELECT_COLUMNS}
FROM message
WHERE conversation_id = ?
ORDER BY created_at DESC, message_id DESC
LIMIT ?
"#
            ))
            .bind(conversation_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoordError::store("list messages (first)", e))?
        };

        Ok(rows.iter().map(Self::row_to_record).collect())
    }
}
