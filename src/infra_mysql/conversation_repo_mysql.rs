use super::util::{downcast, is_dup_key};
use crate::application_port::{ConversationFilter, CoordError};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlConversationRepo {
    pool: MySqlPool,
}

impl MySqlConversationRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_record(r: &MySqlRow) -> ConversationRecord {
        ConversationRecord {
            conversation_id: r.get("conversation_id"),
            kind: r.get("kind"),
            name: r.get("name"),
            avatar_url: r.get("avatar_url"),
            created_by: r.get("created_by"),
            locked: r.get("locked"),
            active: r.get("active"),
            last_activity_at: r.get("last_activity_at"),
            last_activity_summary: r.get("last_activity_summary"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

const SELECT_COLUMNS: &str = r#"
conversation_id, kind, name, avatar_url, created_by, locked, active,
last_activity_at, last_activity_summary, created_at, updated_at
"#;

// Qualified variant for queries that join conversation_member.
const SELECT_COLUMNS_C: &str = r#"
c.conversation_id, c.kind, c.name, c.avatar_url, c.created_by, c.locked, c.active,
c.last_activity_at, c.last_activity_summary, c.created_at, c.updated_at
"#;

#[async_trait::async_trait]
impl ConversationRepo for MySqlConversationRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &ConversationRecord,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO conversation
  (conversation_id, kind, name, avatar_url, created_by, locked, active,
   last_activity_at, last_activity_summary, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(record.conversation_id)
        .bind(record.kind)
        .bind(&record.name)
        .bind(&record.avatar_url)
        .bind(record.created_by)
        .bind(record.locked)
        .bind(record.active)
        .bind(record.last_activity_at)
        .bind(&record.last_activity_summary)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("insert conversation", e))?;

        Ok(())
    }

    async fn get(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationRecord>, CoordError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM conversation WHERE conversation_id = ?"
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoordError::store("get conversation", e))?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    async fn get_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationRecord>, CoordError> {
        let tx = downcast(tx);

        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM conversation WHERE conversation_id = ?"
        ))
        .bind(conversation_id)
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| CoordError::store("get conversation", e))?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    async fn claim_direct_pair_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        pair: &UserPair,
        conversation_id: ConversationId,
    ) -> Result<DirectClaim, CoordError> {
        let tx = downcast(tx);

        let inserted = sqlx::query(
            "INSERT INTO direct_pair (user_min, user_max, conversation_id) VALUES (?, ?, ?)",
        )
        .bind(pair.min())
        .bind(pair.max())
        .bind(conversation_id)
        .execute(tx.conn())
        .await;

        match inserted {
            Ok(_) => Ok(DirectClaim::Won),
            Err(e) if is_dup_key(&e) => {
                let existing: ConversationId = sqlx::query_scalar(
                    "SELECT conversation_id FROM direct_pair WHERE user_min = ? AND user_max = ?",
                )
                .bind(pair.min())
                .bind(pair.max())
                .fetch_one(tx.conn())
                .await
                .map_err(|e| CoordError::store("read direct_pair", e))?;
                Ok(DirectClaim::Existing(existing))
            }
            Err(e) => Err(CoordError::store("claim direct_pair", e)),
        }
    }

    async fn set_inactive_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query(
            "UPDATE conversation SET active = FALSE, updated_at = ? WHERE conversation_id = ?",
        )
        .bind(at)
        .bind(conversation_id)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("deactivate conversation", e))?;

        Ok(())
    }

    async fn set_avatar_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        avatar_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query(
            "UPDATE conversation SET avatar_url = ?, updated_at = ? WHERE conversation_id = ?",
        )
        .bind(avatar_url)
        .bind(at)
        .bind(conversation_id)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("set conversation avatar", e))?;

        Ok(())
    }

    async fn touch_activity_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
        summary: &str,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
UPDATE conversation
SET last_activity_at = ?, last_activity_summary = LEFT(?, 255), updated_at = ?
WHERE conversation_id = ?
"#,
        )
        .bind(at)
        .bind(summary)
        .bind(at)
        .bind(conversation_id)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("touch conversation activity", e))?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        limit: u16,
        after: Option<Cursor>,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationRecord>, CoordError> {
        // Filters conjoin before the order/limit so the n+1 trick stays
        // correct; `(? IS NULL OR ...)` keeps the statement static.
        let keyword = filter.keyword.as_ref().map(|k| format!("%{k}%"));

        let rows = if let Some(cursor) = after {
            sqlx::query(&format!(
                r#"
SELECT {SELECT_COLUMNS_C}
FROM conversation c
JOIN conversation_member cm
  ON cm.conversation_id = c.conversation_id AND cm.active = 1
WHERE cm.user_id = ?
  AND c.last_activity_at IS NOT NULL
  AND (? IS NULL OR c.kind = ?)
  AND (? IS NULL OR c.name LIKE ?)
  AND (c.last_activity_at < ?
       OR (c.last_activity_at = ? AND c.conversation_id < ?))
ORDER BY c.last_activity_at DESC, c.conversation_id DESC
LIMIT ?
"#
            ))
            .bind(user)
            .bind(filter.kind)
            .bind(filter.kind)
            .bind(&keyword)
            .bind(&keyword)
            .bind(cursor.sort_ts)
            .bind(cursor.sort_ts)
            .bind(ConversationId(cursor.tie_break))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoordError::store("list conversations (after)", e))?
        } else {
            sqlx::query(&format!(
                r#"
SELECT {SELECT_COLUMNS_C}
FROM conversation c
JOIN conversation_member cm
  ON cm.conversation_id = c.conversation_id AND cm.active = 1
WHERE cm.user_id = ?
  AND c.last_activity_at IS NOT NULL
  AND (? IS NULL OR c.kind = ?)
  AND (? IS NULL OR c.name LIKE ?)
ORDER BY c.last_activity_at DESC, c.conversation_id DESC
LIMIT ?
"#
            ))
            .bind(user)
            .bind(filter.kind)
            .bind(filter.kind)
            .bind(&keyword)
            .bind(&keyword)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoordError::store("list conversations (first)", e))?
        };

        Ok(rows.iter().map(Self::row_to_record).collect())
    }
}
