use crate::application_port::CoordError;
use crate::domain_model::UserId;
use crate::domain_port::BlockRepo;
use sqlx::MySqlPool;

pub struct MySqlBlockRepo {
    pool: MySqlPool,
}

impl MySqlBlockRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BlockRepo for MySqlBlockRepo {
    async fn is_blocked_either(&self, a: UserId, b: UserId) -> Result<bool, CoordError> {
        let count: i64 = sqlx::query_scalar(
            r#"
SELECT COUNT(*) FROM block_relation
WHERE (blocker_id = ? AND blocked_id = ?) OR (blocker_id = ? AND blocked_id = ?)
"#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CoordError::store("probe block relation", e))?;

        Ok(count > 0)
    }

    async fn insert(&self, blocker: UserId, blocked: UserId) -> Result<(), CoordError> {
        sqlx::query(
            r#"
INSERT INTO block_relation (blocker_id, blocked_id, created_at)
VALUES (?, ?, UTC_TIMESTAMP())
ON DUPLICATE KEY UPDATE blocker_id = blocker_id
"#,
        )
        .bind(blocker)
        .bind(blocked)
        .execute(&self.pool)
        .await
        .map_err(|e| CoordError::store("insert block relation", e))?;

        Ok(())
    }
}
