use crate::domain_model::{BusinessType, UploadHandle, UploadHandleId};
use crate::domain_port::ObjectStorageClient;
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Stand-in for the object-storage collaborator: mints handles locally and
/// never uploads anything. Completion notices are injected by tests (or by
/// the broker in a real deployment).
pub struct FakeObjectStorage {
    base_url: String,
}

impl FakeObjectStorage {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStorageClient for FakeObjectStorage {
    async fn issue_upload_handle(
        &self,
        file_name: &str,
        _content_type: &str,
        _size_bytes: u64,
        business_type: BusinessType,
        business_id: Uuid,
    ) -> anyhow::Result<UploadHandle> {
        let handle_id = UploadHandleId(Uuid::new_v4());
        Ok(UploadHandle {
            handle_id,
            upload_url: format!(
                "{}/upload/{}/{}/{}?name={}",
                self.base_url,
                business_type.as_str(),
                business_id,
                handle_id,
                file_name
            ),
            expires_at: Utc::now() + Duration::minutes(15),
        })
    }
}
