use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_mem::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use nanoid::nanoid;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SEEN_LEDGER_TTL_SECS: u64 = 7 * 24 * 60 * 60;

struct Repos {
    tx_manager: Arc<dyn TxManager>,
    conversation_repo: Arc<dyn ConversationRepo>,
    member_repo: Arc<dyn MemberRepo>,
    invite_repo: Arc<dyn InviteRepo>,
    block_repo: Arc<dyn BlockRepo>,
    message_repo: Arc<dyn MessageRepo>,
    upload_intent_repo: Arc<dyn UploadIntentRepo>,
    outbox_repo: Arc<dyn OutboxRepo>,
}

pub struct Server {
    pub invite_service: Arc<dyn InviteService>,
    pub conversation_service: Arc<dyn ConversationService>,
    pub message_service: Arc<dyn MessageService>,
    consumer_handle: Mutex<Option<JoinHandle<()>>>,
    notifier_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let run_id = nanoid!(10, &alphabet);

        let cancel = CancellationToken::new();

        let (repos, seen_ledger, pool) = match settings.storage.backend.as_str() {
            "mysql" => {
                let pool = Pool::<MySql>::connect(&settings.mysql.dsn).await?;

                let redis_client = redis::Client::open(settings.redis.dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                let seen_ledger: Arc<dyn SeenLedger> = Arc::new(RedisSeenLedger::new(
                    redis_manager,
                    "upload-notice-seen",
                    SEEN_LEDGER_TTL_SECS,
                ));

                let repos = Repos {
                    tx_manager: Arc::new(MySqlTxManager::new(pool.clone())),
                    conversation_repo: Arc::new(MySqlConversationRepo::new(pool.clone())),
                    member_repo: Arc::new(MySqlMemberRepo::new(pool.clone())),
                    invite_repo: Arc::new(MySqlInviteRepo::new(pool.clone())),
                    block_repo: Arc::new(MySqlBlockRepo::new(pool.clone())),
                    message_repo: Arc::new(MySqlMessageRepo::new(pool.clone())),
                    upload_intent_repo: Arc::new(MySqlUploadIntentRepo::new()),
                    outbox_repo: Arc::new(MySqlOutboxRepo::new()),
                };
                (repos, seen_ledger, Some(pool))
            }
            "mem" => {
                let store = Arc::new(MemStore::new());
                let seen_ledger: Arc<dyn SeenLedger> = Arc::new(MemSeenLedger::new());

                let repos = Repos {
                    tx_manager: Arc::new(MemTxManager),
                    conversation_repo: Arc::new(MemConversationRepo::new(store.clone())),
                    member_repo: Arc::new(MemMemberRepo::new(store.clone())),
                    invite_repo: Arc::new(MemInviteRepo::new(store.clone())),
                    block_repo: Arc::new(MemBlockRepo::new(store.clone())),
                    message_repo: Arc::new(MemMessageRepo::new(store.clone())),
                    upload_intent_repo: Arc::new(MemUploadIntentRepo::new(store.clone())),
                    outbox_repo: Arc::new(MemOutboxRepo::new(store)),
                };
                (repos, seen_ledger, None)
            }
            other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        };

        let identity_client: Arc<dyn IdentityClient> = Arc::new(FakeIdentityClient::new());
        let object_storage: Arc<dyn ObjectStorageClient> =
            Arc::new(FakeObjectStorage::new(&settings.files.public_base_url));

        let invite_service: Arc<dyn InviteService> = Arc::new(RealInviteService::new(
            repos.conversation_repo.clone(),
            repos.member_repo.clone(),
            repos.invite_repo.clone(),
            repos.block_repo.clone(),
            repos.outbox_repo.clone(),
            identity_client.clone(),
            repos.tx_manager.clone(),
        ));

        let conversation_service: Arc<dyn ConversationService> =
            Arc::new(RealConversationService::new(
                repos.conversation_repo.clone(),
                repos.member_repo.clone(),
                repos.invite_repo.clone(),
                repos.block_repo.clone(),
                repos.upload_intent_repo.clone(),
                repos.outbox_repo.clone(),
                identity_client.clone(),
                object_storage,
                invite_service.clone(),
                repos.tx_manager.clone(),
                settings.files.public_base_url.clone(),
            ));

        let message_service: Arc<dyn MessageService> = Arc::new(RealMessageService::new(
            repos.conversation_repo.clone(),
            repos.member_repo.clone(),
            repos.message_repo.clone(),
            repos.outbox_repo.clone(),
            repos.tx_manager.clone(),
        ));

        // region runtime infra

        let publisher: Arc<dyn EventPublisher> = Arc::new(KafkaPublisher::new(
            &settings.broker.bootstrap,
            &format!("colloquy-pub-{}", run_id),
        )?);
        let consumer: Arc<dyn EventConsumer> = Arc::new(KafkaConsumer::new(
            &settings.broker.bootstrap,
            &format!("colloquy-sub-{}", run_id),
            cancel.clone(),
        ));

        let notifier = Notifier::new(
            repos.tx_manager.clone(),
            repos.outbox_repo.clone(),
            publisher,
            &settings.broker.topic_prefix,
            cancel.clone(),
        );
        let notifier_handle = tokio::spawn(async move {
            let _ = notifier.run().await;
        });

        let upload_handler: Arc<dyn EventHandler> = Arc::new(UploadNoticeHandler::new(
            seen_ledger,
            conversation_service.clone(),
        ));
        let upload_topic = settings.broker.upload_notice_topic.clone();
        let consumer_handle = tokio::spawn(async move {
            // group id stays fixed so offsets survive restarts
            let _ = consumer
                .run("colloquy.upload-notice", &[&upload_topic], upload_handler)
                .await;
        });

        // endregion

        info!("server started");

        Ok(Self {
            invite_service,
            conversation_service,
            message_service,
            consumer_handle: Mutex::new(Some(consumer_handle)),
            notifier_handle: Mutex::new(Some(notifier_handle)),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let notifier = self.notifier_handle.lock().ok().and_then(|mut l| l.take());
        if let Some(handle) = notifier {
            let r = handle.await;
            info!("notifier handle dropped: {:?}", r);
        }
        let consumer = self.consumer_handle.lock().ok().and_then(|mut l| l.take());
        if let Some(handle) = consumer {
            let r = handle.await;
            info!("consumer handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
