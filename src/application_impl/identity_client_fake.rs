use crate::application_port::CoordError;
use crate::domain_model::{UserId, UserSummary};
use crate::domain_port::IdentityClient;
use dashmap::DashMap;

/// Stand-in for the identity collaborator: a seedable in-process directory.
/// Unknown users resolve to a placeholder name so demo flows never trip on
/// missing profiles; tests seed explicit summaries when names matter.
#[derive(Default)]
pub struct FakeIdentityClient {
    users: DashMap<UserId, UserSummary>,
}

impl FakeIdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, summary: UserSummary) {
        self.users.insert(summary.user_id, summary);
    }
}

#[async_trait::async_trait]
impl IdentityClient for FakeIdentityClient {
    async fn get_summary(&self, user_id: UserId) -> Result<UserSummary, CoordError> {
        if let Some(summary) = self.users.get(&user_id) {
            return Ok(summary.clone());
        }
        Ok(UserSummary {
            user_id,
            display_name: format!("user-{}", &user_id.to_string()[..8]),
            avatar_url: None,
            roles: Vec::new(),
        })
    }
}
