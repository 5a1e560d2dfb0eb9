use super::util::{downcast, is_dup_key};
use crate::application_port::{CoordError, InviteFilter};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlInviteRepo {
    pool: MySqlPool,
}

impl MySqlInviteRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_record(r: &MySqlRow) -> InviteRecord {
        InviteRecord {
            invite_id: r.get("invite_id"),
            conversation_id: r.get("conversation_id"),
            conversation_name: r.get("conversation_name"),
            sender_id: r.get("sender_id"),
            sender_name: r.get("sender_name"),
            sender_avatar: r.get("sender_avatar"),
            receiver_id: r.get("receiver_id"),
            receiver_name: r.get("receiver_name"),
            receiver_avatar: r.get("receiver_avatar"),
            status: r.get("status"),
            note: r.get("note"),
            requested_at: r.get("requested_at"),
            responded_at: r.get("responded_at"),
        }
    }
}

const SELECT_COLUMNS: &str = r#"
invite_id, conversation_id, conversation_name, sender_id, sender_name,
sender_avatar, receiver_id, receiver_name, receiver_avatar,
status, note, requested_at, responded_at
"#;

#[async_trait::async_trait]
impl InviteRepo for MySqlInviteRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &InviteRecord,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        // `pending` mirrors the status as 1/NULL so the
        // UNIQUE(conversation_id, receiver_id, pending) index only bites
        // while the invite is open.
        let pending: Option<i8> = (record.status == InviteStatus::Pending).then_some(1);

        sqlx::query(
            r#"
INSERT INTO invite
  (invite_id, conversation_id, conversation_name, sender_id, sender_name,
   sender_avatar, receiver_id, receiver_name, receiver_avatar,
   status, pending, note, requested_at, responded_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(record.invite_id)
        .bind(record.conversation_id)
        .bind(&record.conversation_name)
        .bind(record.sender_id)
        .bind(&record.sender_name)
        .bind(&record.sender_avatar)
        .bind(record.receiver_id)
        .bind(&record.receiver_name)
        .bind(&record.receiver_avatar)
        .bind(record.status)
        .bind(pending)
        .bind(&record.note)
        .bind(record.requested_at)
        .bind(record.responded_at)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                CoordError::Conflict("pending invite already exists")
            } else {
                CoordError::store("insert invite", e)
            }
        })?;

        Ok(())
    }

    async fn has_pending_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        receiver: UserId,
    ) -> Result<bool, CoordError> {
        let tx = downcast(tx);

        let count: i64 = sqlx::query_scalar(
            r#"
SELECT COUNT(*) FROM invite
WHERE conversation_id = ? AND receiver_id = ? AND pending = 1
"#,
        )
        .bind(conversation_id)
        .bind(receiver)
        .fetch_one(tx.conn())
        .await
        .map_err(|e| CoordError::store("probe pending invite", e))?;

        Ok(count > 0)
    }

    async fn get_for_receiver_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        invite_id: InviteId,
        receiver: UserId,
    ) -> Result<Option<InviteRecord>, CoordError> {
        let tx = downcast(tx);

        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM invite WHERE invite_id = ? AND receiver_id = ?"
        ))
        .bind(invite_id)
        .bind(receiver)
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| CoordError::store("get invite", e))?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    async fn mark_responded_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        invite_id: InviteId,
        to: InviteStatus,
        responded_at: DateTime<Utc>,
    ) -> Result<u64, CoordError> {
        let tx = downcast(tx);

        let done = sqlx::query(
            r#"
UPDATE invite
SET status = ?, pending = NULL, responded_at = ?
WHERE invite_id = ? AND status = ?
"#,
        )
        .bind(to)
        .bind(responded_at)
        .bind(invite_id)
        .bind(InviteStatus::Pending)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("mark invite responded", e))?;

        Ok(done.rows_affected())
    }

    async fn delete_pending_for_conversation_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query("DELETE FROM invite WHERE conversation_id = ? AND pending = 1")
            .bind(conversation_id)
            .execute(tx.conn())
            .await
            .map_err(|e| CoordError::store("delete pending invites", e))?;

        Ok(())
    }

    async fn list_for_receiver(
        &self,
        receiver: UserId,
        limit: u16,
        after: Option<Cursor>,
        filter: &InviteFilter,
    ) -> Result<Vec<InviteRecord>, CoordError> {
        let keyword = filter
            .keyword
            .as_ref()
            .map(|k| format!("%{k}%"));

        let rows = if let Some(cursor) = after {
            sqlx::query(&format!(
                r#"
SELECT {SELECT_COLUMNS}
FROM invite
WHERE receiver_id = ?
  AND (? IS NULL OR status = ?)
  AND (? IS NULL OR conversation_name LIKE ? OR sender_name LIKE ?)
  AND (requested_at < ? OR (requested_at = ? AND invite_id < ?))
ORDER BY requested_at DESC, invite_id DESC
LIMIT ?
"#
            ))
            .bind(receiver)
            .bind(filter.status)
            .bind(filter.status)
            .bind(&keyword)
            .bind(&keyword)
            .bind(&keyword)
            .bind(cursor.sort_ts)
            .bind(cursor.sort_ts)
            .bind(InviteId(cursor.tie_break))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoordError::store("list invites (after)", e))?
        } else {
            sqlx::query(&format!(
                r#"
SELECT {SELECT_COLUMNS}
FROM invite
WHERE receiver_id = ?
  AND (? IS NULL OR status = ?)
  AND (? IS NULL OR conversation_name LIKE ? OR sender_name LIKE ?)
ORDER BY requested_at DESC, invite_id DESC
LIMIT ?
"#
            ))
            .bind(receiver)
            .bind(filter.status)
            .bind(filter.status)
            .bind(&keyword)
            .bind(&keyword)
            .bind(&keyword)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoordError::store("list invites (first)", e))?
        };

        Ok(rows.iter().map(Self::row_to_record).collect())
    }
}
