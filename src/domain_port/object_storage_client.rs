use crate::domain_model::{BusinessType, UploadHandle};

/// Object-storage collaborator. The core never touches raw storage; it asks
/// for an upload handle here and later receives an out-of-band completion
/// notice over the broker.
#[async_trait::async_trait]
pub trait ObjectStorageClient: Send + Sync {
    async fn issue_upload_handle(
        &self,
        file_name: &str,
        content_type: &str,
        size_bytes: u64,
        business_type: BusinessType,
        business_id: uuid::Uuid,
    ) -> anyhow::Result<UploadHandle>;
}
