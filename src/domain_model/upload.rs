use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UploadHandleId(pub uuid::Uuid);

impl fmt::Display for UploadHandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an upload handle was issued for. Completion notices carrying any
/// other business type are not ours and must be left alone.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessType {
    ConversationAvatar,
}

impl BusinessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::ConversationAvatar => "CONVERSATION_AVATAR",
        }
    }
}

impl FromStr for BusinessType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONVERSATION_AVATAR" => Ok(BusinessType::ConversationAvatar),
            other => Err(format!("unknown business type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadIntentStatus {
    Pending,
    Completed,
    Discarded,
}

/// Phase-1 record: a handle was issued and we expect (at least one)
/// completion notice for it later.
#[derive(Debug, Clone, Serialize)]
pub struct UploadIntent {
    pub handle_id: UploadHandleId,
    pub business_type: BusinessType,
    pub business_id: uuid::Uuid,
    pub requested_by: UserId,
    pub status: UploadIntentStatus,
    pub created_at: DateTime<Utc>,
}

/// Phase-1 response handed back to the client: where to PUT the bytes.
#[derive(Debug, Clone, Serialize)]
pub struct UploadHandle {
    pub handle_id: UploadHandleId,
    pub upload_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Out-of-band completion notice from the object-storage collaborator,
/// delivered at-least-once over the broker. `business_type` arrives as a
/// raw string because the topic is shared with uploads we do not own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadedNotice {
    pub handle_id: UploadHandleId,
    pub business_type: String,
    pub business_id: String,
    pub bucket: String,
    pub object_key: String,
    pub content_type: String,
}
