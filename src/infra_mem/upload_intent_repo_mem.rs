use super::store::{lock, MemStore};
use crate::application_port::CoordError;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

pub struct MemUploadIntentRepo {
    store: Arc<MemStore>,
}

impl MemUploadIntentRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl UploadIntentRepo for MemUploadIntentRepo {
    async fn insert_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        intent: &UploadIntent,
    ) -> Result<(), CoordError> {
        lock(&self.store.upload_intents).insert(intent.handle_id, intent.clone());
        Ok(())
    }

    async fn get_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        handle_id: UploadHandleId,
    ) -> Result<Option<UploadIntent>, CoordError> {
        Ok(lock(&self.store.upload_intents).get(&handle_id).cloned())
    }

    async fn mark_in_tx(
        &self,
        _tx: &mut dyn StorageTx<'_>,
        handle_id: UploadHandleId,
        status: UploadIntentStatus,
    ) -> Result<(), CoordError> {
        if let Some(i) = lock(&self.store.upload_intents).get_mut(&handle_id) {
            i.status = status;
        }
        Ok(())
    }
}
