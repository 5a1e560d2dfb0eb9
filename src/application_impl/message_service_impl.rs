use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct RealMessageService {
    conversation_repo: Arc<dyn ConversationRepo>,
    member_repo: Arc<dyn MemberRepo>,
    message_repo: Arc<dyn MessageRepo>,
    outbox_repo: Arc<dyn OutboxRepo>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealMessageService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepo>,
        member_repo: Arc<dyn MemberRepo>,
        message_repo: Arc<dyn MessageRepo>,
        outbox_repo: Arc<dyn OutboxRepo>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            conversation_repo,
            member_repo,
            message_repo,
            outbox_repo,
            tx_manager,
        }
    }
}

#[async_trait::async_trait]
impl MessageService for RealMessageService {
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: &str,
    ) -> Result<MessageRecord, CoordError> {
        if content.trim().is_empty() {
            return Err(CoordError::InvalidState("empty message"));
        }

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        let conversation = self
            .conversation_repo
            .get_in_tx(&mut *tx, conversation_id)
            .await?
            .ok_or(CoordError::NotFound)?;
        if !conversation.active {
            return Err(CoordError::InvalidState("conversation inactive"));
        }
        let sender_member = self
            .member_repo
            .get_live_in_tx(&mut *tx, conversation_id, sender)
            .await?
            .ok_or(CoordError::Forbidden("not a member"))?;

        let now = Utc::now();
        let message = MessageRecord {
            message_id: MessageId(Uuid::new_v4()),
            conversation_id,
            sender_id: sender,
            sender_name: sender_member.display_name.clone(),
            sender_avatar: sender_member.avatar_url.clone(),
            content: content.to_owned(),
            created_at: now,
        };
        self.message_repo.insert_in_tx(&mut *tx, &message).await?;
        self.conversation_repo
            .touch_activity_in_tx(
                &mut *tx,
                conversation_id,
                now,
                &format!("{}: {}", message.sender_name, message.preview()),
            )
            .await?;

        let receivers = self
            .member_repo
            .list_live_in_tx(&mut *tx, conversation_id)
            .await?
            .iter()
            .map(|m| m.user_id)
            .filter(|id| *id != sender)
            .collect();
        let event = OutboxEvent::new(
            EventType::MessageCreated,
            Some(conversation_id.0),
            receivers,
            &DomainEvent::MessageCreated(MessageCreated {
                message_id: message.message_id,
                conversation_id,
                sender_id: sender,
                sender_name: message.sender_name.clone(),
                preview: message.preview(),
                created_at: now,
            }),
        )
        .map_err(|e| CoordError::store("compose message.created", e))?;
        self.outbox_repo
            .enqueue_in_tx(&mut *tx, &event)
            .await
            .map_err(|e| CoordError::store("enqueue message.created", e))?;

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))?;

        Ok(message)
    }

    async fn get_history(
        &self,
        user: UserId,
        conversation_id: ConversationId,
        page_size: PageSize,
        before: Option<Cursor>,
    ) -> Result<Page<MessageRecord>, CoordError> {
        if self
            .conversation_repo
            .get(conversation_id)
            .await?
            .is_none()
        {
            return Err(CoordError::NotFound);
        }
        if self
            .member_repo
            .get_live(conversation_id, user)
            .await?
            .is_none()
        {
            return Err(CoordError::Forbidden("not a member"));
        }

        let rows = self
            .message_repo
            .list_for_conversation(conversation_id, page_size.0 + 1, before)
            .await?;
        Ok(Page::from_rows(rows, page_size.0 as usize, |m| {
            Cursor::new(m.created_at, m.message_id.0)
        }))
    }
}
