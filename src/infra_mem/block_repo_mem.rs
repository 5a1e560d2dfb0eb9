use super::store::{lock, MemStore};
use crate::application_port::CoordError;
use crate::domain_model::UserId;
use crate::domain_port::BlockRepo;
use std::sync::Arc;

pub struct MemBlockRepo {
    store: Arc<MemStore>,
}

impl MemBlockRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl BlockRepo for MemBlockRepo {
    async fn is_blocked_either(&self, a: UserId, b: UserId) -> Result<bool, CoordError> {
        Ok(lock(&self.store.blocks)
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a)))
    }

    async fn insert(&self, blocker: UserId, blocked: UserId) -> Result<(), CoordError> {
        let mut blocks = lock(&self.store.blocks);
        if !blocks.contains(&(blocker, blocked)) {
            blocks.push((blocker, blocked));
        }
        Ok(())
    }
}
