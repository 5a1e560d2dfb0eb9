#![allow(dead_code)]

use colloquy::application_impl::*;
use colloquy::application_port::*;
use colloquy::domain_model::*;
use colloquy::domain_port::*;
use colloquy::infra_mem::*;
use std::sync::Arc;
use uuid::Uuid;

/// Full service stack over the process-local backend. Tests drive the real
/// service implementations; only storage and the collaborators are local.
pub struct TestEnv {
    pub store: Arc<MemStore>,
    pub identity: Arc<FakeIdentityClient>,
    pub invite_service: Arc<dyn InviteService>,
    pub conversation_service: Arc<dyn ConversationService>,
    pub message_service: Arc<dyn MessageService>,
    pub block_repo: Arc<dyn BlockRepo>,
    pub outbox_repo: Arc<dyn OutboxRepo>,
    pub tx_manager: Arc<dyn TxManager>,
}

pub const FILE_BASE_URL: &str = "https://files.test.local";

impl TestEnv {
    pub fn new() -> Self {
        let store = Arc::new(MemStore::new());
        let identity = Arc::new(FakeIdentityClient::new());

        let tx_manager: Arc<dyn TxManager> = Arc::new(MemTxManager);
        let conversation_repo: Arc<dyn ConversationRepo> =
            Arc::new(MemConversationRepo::new(store.clone()));
        let member_repo: Arc<dyn MemberRepo> = Arc::new(MemMemberRepo::new(store.clone()));
        let invite_repo: Arc<dyn InviteRepo> = Arc::new(MemInviteRepo::new(store.clone()));
        let block_repo: Arc<dyn BlockRepo> = Arc::new(MemBlockRepo::new(store.clone()));
        let message_repo: Arc<dyn MessageRepo> = Arc::new(MemMessageRepo::new(store.clone()));
        let upload_intent_repo: Arc<dyn UploadIntentRepo> =
            Arc::new(MemUploadIntentRepo::new(store.clone()));
        let outbox_repo: Arc<dyn OutboxRepo> = Arc::new(MemOutboxRepo::new(store.clone()));

        let identity_client: Arc<dyn IdentityClient> = identity.clone();
        let object_storage: Arc<dyn ObjectStorageClient> =
            Arc::new(FakeObjectStorage::new(FILE_BASE_URL));

        let invite_service: Arc<dyn InviteService> = Arc::new(RealInviteService::new(
            conversation_repo.clone(),
            member_repo.clone(),
            invite_repo.clone(),
            block_repo.clone(),
            outbox_repo.clone(),
            identity_client.clone(),
            tx_manager.clone(),
        ));

        let conversation_service: Arc<dyn ConversationService> =
            Arc::new(RealConversationService::new(
                conversation_repo.clone(),
                member_repo.clone(),
                invite_repo.clone(),
                block_repo.clone(),
                upload_intent_repo,
                outbox_repo.clone(),
                identity_client,
                object_storage,
                invite_service.clone(),
                tx_manager.clone(),
                FILE_BASE_URL.to_string(),
            ));

        let message_service: Arc<dyn MessageService> = Arc::new(RealMessageService::new(
            conversation_repo,
            member_repo,
            message_repo,
            outbox_repo.clone(),
            tx_manager.clone(),
        ));

        Self {
            store,
            identity,
            invite_service,
            conversation_service,
            message_service,
            block_repo,
            outbox_repo,
            tx_manager,
        }
    }

    pub fn user(&self, display_name: &str) -> UserId {
        self.user_with_roles(display_name, &[])
    }

    pub fn admin(&self, display_name: &str) -> UserId {
        self.user_with_roles(display_name, &["admin"])
    }

    fn user_with_roles(&self, display_name: &str, roles: &[&str]) -> UserId {
        let user_id = UserId(Uuid::new_v4());
        self.identity.seed(UserSummary {
            user_id,
            display_name: display_name.to_string(),
            avatar_url: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        });
        user_id
    }

    pub fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.store
            .outbox
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn events_of(&self, event_type: EventType) -> Vec<OutboxEvent> {
        self.outbox_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn receivers_of(event: &OutboxEvent) -> Vec<UserId> {
        serde_json::from_value(event.receivers_json.clone()).unwrap()
    }

    /// Full group-creation shortcut: creates the group and accepts every
    /// invite so the members are live.
    pub async fn group_with_members(
        &self,
        owner: UserId,
        name: &str,
        members: &[UserId],
    ) -> ConversationId {
        let conversation = self
            .conversation_service
            .create_group(owner, name, ConversationKind::Group, members.to_vec())
            .await
            .unwrap();

        for member in members {
            let page = self
                .invite_service
                .list_invites(
                    *member,
                    PageSize(10),
                    None,
                    InviteFilter {
                        status: Some(InviteStatus::Pending),
                        keyword: None,
                    },
                )
                .await
                .unwrap();
            let invite = page
                .items
                .iter()
                .find(|i| i.conversation_id == conversation.conversation_id)
                .unwrap();
            self.invite_service
                .respond_to_invite(invite.invite_id, *member, InviteDecision::Accept)
                .await
                .unwrap();
        }

        conversation.conversation_id
    }
}
