use super::util::downcast;
use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::Row;

// Every operation shares a caller-owned transaction, so no pool is held.
#[derive(Default)]
pub struct MySqlUploadIntentRepo;

impl MySqlUploadIntentRepo {
    pub fn new() -> Self {
        Self
    }

    fn row_to_intent(r: &MySqlRow) -> UploadIntent {
        UploadIntent {
            handle_id: r.get("handle_id"),
            business_type: r.get("business_type"),
            business_id: r.get("business_id"),
            requested_by: r.get("requested_by"),
            status: r.get("status"),
            created_at: r.get("created_at"),
        }
    }
}

#[async_trait::async_trait]
impl UploadIntentRepo for MySqlUploadIntentRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        intent: &UploadIntent,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO upload_intent
  (handle_id, business_type, business_id, requested_by, status, created_at)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(intent.handle_id)
        .bind(intent.business_type)
        .bind(intent.business_id)
        .bind(intent.requested_by)
        .bind(intent.status)
        .bind(intent.created_at)
        .execute(tx.conn())
        .await
        .map_err(|e| CoordError::store("insert upload intent", e))?;

        Ok(())
    }

    async fn get_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        handle_id: UploadHandleId,
    ) -> Result<Option<UploadIntent>, CoordError> {
        let tx = downcast(tx);

        let row = sqlx::query(
            r#"
SELECT handle_id, business_type, business_id, requested_by, status, created_at
FROM upload_intent
WHERE handle_id = ?
"#,
        )
        .bind(handle_id)
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| CoordError::store("get upload intent", e))?;

        Ok(row.map(|r| Self::row_to_intent(&r)))
    }

    async fn mark_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        handle_id: UploadHandleId,
        status: UploadIntentStatus,
    ) -> Result<(), CoordError> {
        let tx = downcast(tx);

        sqlx::query("UPDATE upload_intent SET status = ? WHERE handle_id = ?")
            .bind(status)
            .bind(handle_id)
            .execute(tx.conn())
            .await
            .map_err(|e| CoordError::store("mark upload intent", e))?;

        Ok(())
    }
}
