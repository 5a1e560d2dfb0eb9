use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait UploadIntentRepo: Send + Sync {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        intent: &UploadIntent,
    ) -> Result<(), CoordError>;

    async fn get_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        handle_id: UploadHandleId,
    ) -> Result<Option<UploadIntent>, CoordError>;

    async fn mark_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        handle_id: UploadHandleId,
        status: UploadIntentStatus,
    ) -> Result<(), CoordError>;
}
