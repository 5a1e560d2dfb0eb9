//! Process-local storage backend. Useful for development runs without a
//! database and for service-level tests.

mod block_repo_mem;
mod conversation_repo_mem;
mod invite_repo_mem;
mod member_repo_mem;
mod message_repo_mem;
mod outbox_repo_mem;
mod repo_tx_mem;
mod seen_ledger_mem;
mod store;
mod upload_intent_repo_mem;

pub use block_repo_mem::MemBlockRepo;
pub use conversation_repo_mem::MemConversationRepo;
pub use invite_repo_mem::MemInviteRepo;
pub use member_repo_mem::MemMemberRepo;
pub use message_repo_mem::MemMessageRepo;
pub use outbox_repo_mem::MemOutboxRepo;
pub use repo_tx_mem::{MemTx, MemTxManager};
pub use seen_ledger_mem::MemSeenLedger;
pub use store::{MemStore, OutboxRow};
pub use upload_intent_repo_mem::MemUploadIntentRepo;
