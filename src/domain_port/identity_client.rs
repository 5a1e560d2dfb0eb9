use crate::application_port::CoordError;
use crate::domain_model::{UserId, UserSummary};

/// Identity collaborator: display fields and roles, fetched only at write
/// time to denormalize into invite/member rows. The core never revalidates
/// identity on reads.
#[async_trait::async_trait]
pub trait IdentityClient: Send + Sync {
    async fn get_summary(&self, user_id: UserId) -> Result<UserSummary, CoordError>;
}
