mod block_repo_mysql;
mod conversation_repo_mysql;
mod invite_repo_mysql;
mod member_repo_mysql;
mod message_repo_mysql;
mod outbox_repo_mysql;
mod repo_tx_mysql;
mod upload_intent_repo_mysql;
mod util;

pub use block_repo_mysql::MySqlBlockRepo;
pub use conversation_repo_mysql::MySqlConversationRepo;
pub use invite_repo_mysql::MySqlInviteRepo;
pub use member_repo_mysql::MySqlMemberRepo;
pub use message_repo_mysql::MySqlMessageRepo;
pub use outbox_repo_mysql::MySqlOutboxRepo;
pub use repo_tx_mysql::{MySqlTx, MySqlTxManager};
pub use upload_intent_repo_mysql::MySqlUploadIntentRepo;
