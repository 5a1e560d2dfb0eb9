use super::util::{downcast, is_dup_key};
use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlMemberRepo {
    pool: MySqlPool,
}

impl MySqlMemberRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_record(r: &MySqlRow) -> MemberRecord {
        MemberRecord {
            member_id: r.get("member_id"),
            conversation_id: r.get("conversation_id"),
            user_id: r.get("user_id"),
            status: r.get("status"),
            display_name: r.get("display_name"),
            avatar_url: r.get("avatar_url"),
            joined_at: r.get("joined_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

const SELECT_COLUMNS: &str = r#"
member_id, conversation_id, user_id, status, display_name, avatar_url,
joined_at, updated_at
"#;

#[async_trait::async_trait]
impl MemberRepo for MySqlMemberRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        record: &MemberRecord,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        // `active` is 1 for live rows and NULL otherwise, so the
        // UNIQUE(conversation_id, user_id, active) index only constrains
        // live rows.
        let active: Option<i8> = record.status.is_live().then_some(1);

        sqlx::query(
            r#"
INSERT INTO conversation_member
  (member_id, conversation_id, user_id, status, active, display_name,
   avatar_url, joined_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(record.member_id)
        .bind(record.conversation_id)
        .bind(record.user_id)
        .bind(record.status)
        .bind(active)
        .bind(&record.display_name)
        .bind(&record.avatar_url)
        .bind(record.joined_at)
        .bind(record.updated_at)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                CoordError::Conflict("user already has a live membership")
            } else {
                CoordError::store("insert member", e)
            }
        })?;

        Ok(())
    }

    async fn get_live(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<MemberRecord>, CoordError> {
        let row = sqlx::query(&format!(
            r#"
SELECT {SELECT_COLUMNS}
FROM conversation_member
WHERE conversation_id = ? AND user_id = ? AND active = 1
"#
        ))
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoordError::store("get live member", e))?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    async fn get_live_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<MemberRecord>, CoordError> {
        let tx = downcast(tx);

        let row = sqlx::query(&format!(
            r#"
SELECT {SELECT_COLUMNS}
FROM conversation_member
WHERE conversation_id = ? AND user_id = ? AND active = 1
"#
        ))
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| CoordError::store("get live member", e))?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    async fn list_live_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
    ) -> Result<Vec<MemberRecord>, CoordError> {
        let tx = downcast(tx);

        let rows = sqlx::query(&format!(
            r#"
SELECT {SELECT_COLUMNS}
FROM conversation_member
WHERE conversation_id = ? AND active = 1
ORDER BY joined_at ASC
"#
        ))
        .bind(conversation_id)
        .fetch_all(tx.conn())
        .await
        .map_err(|e| CoordError::store("list live members", e))?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    async fn transition_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        member_id: MemberId,
        from: MemberStatus,
        to: MemberStatus,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);
        let active: Option<i8> = to.is_live().then_some(1);

        let done = sqlx::query(
            r#"
UPDATE conversation_member
SET status = ?, active = ?, updated_at = ?
WHERE member_id = ? AND status = ?
"#,
        )
        .bind(to)
        .bind(active)
        .bind(at)
        .bind(member_id)
        .bind(from)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("transition member", e))?;

        if done.rows_affected() == 0 {
            return Err(CoordError::InvalidState("member status changed concurrently"));
        }

        Ok(())
    }

    async fn remove_all_live_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
UPDATE conversation_member
SET status = ?, active = NULL, updated_at = ?
WHERE conversation_id = ? AND active = 1
"#,
        )
        .bind(MemberStatus::Removed)
        .bind(at)
        .bind(conversation_id)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("remove live members", e))?;

        Ok(())
    }
}
