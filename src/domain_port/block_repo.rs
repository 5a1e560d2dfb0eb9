use crate::application_port::CoordError;
use crate::domain_model::UserId;

#[async_trait::async_trait]
pub trait BlockRepo: Send + Sync {
    /// True if a block relation exists in either direction between the two
    /// users. Invite creation and direct-conversation start both gate on
    /// this.
    async fn is_blocked_either(&self, a: UserId, b: UserId) -> Result<bool, CoordError>;

    async fn insert(&self, blocker: UserId, blocked: UserId) -> Result<(), CoordError>;
}
