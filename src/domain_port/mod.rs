// collaborator clients

mod identity_client;
mod object_storage_client;
mod seen_ledger;

pub use identity_client::*;
pub use object_storage_client::*;
pub use seen_ledger::*;

// repos

mod block_repo;
mod conversation_repo;
mod invite_repo;
mod member_repo;
mod message_repo;
mod outbox_repo;
mod upload_intent_repo;

mod repo_tx;

pub use block_repo::*;
pub use conversation_repo::*;
pub use invite_repo::*;
pub use member_repo::*;
pub use message_repo::*;
pub use outbox_repo::*;
pub use upload_intent_repo::*;

pub use repo_tx::*;
