use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct RealInviteService {
    conversation_repo: Arc<dyn ConversationRepo>,
    member_repo: Arc<dyn MemberRepo>,
    invite_repo: Arc<dyn InviteRepo>,
    block_repo: Arc<dyn BlockRepo>,
    outbox_repo: Arc<dyn OutboxRepo>,
    identity_client: Arc<dyn IdentityClient>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealInviteService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepo>,
        member_repo: Arc<dyn MemberRepo>,
        invite_repo: Arc<dyn InviteRepo>,
        block_repo: Arc<dyn BlockRepo>,
        outbox_repo: Arc<dyn OutboxRepo>,
        identity_client: Arc<dyn IdentityClient>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            conversation_repo,
            member_repo,
            invite_repo,
            block_repo,
            outbox_repo,
            identity_client,
            tx_manager,
        }
    }
}

#[async_trait::async_trait]
impl InviteService for RealInviteService {
    async fn create_invite(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        receiver: UserId,
        note: Option<String>,
    ) -> Result<InviteRecord, CoordError> {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        // Precondition order is part of the contract: first failure wins.
        let conversation = self
            .conversation_repo
            .get_in_tx(&mut *tx, conversation_id)
            .await?
            .ok_or(CoordError::NotFound)?;
        if !conversation.accepts_membership_changes() {
            return Err(CoordError::InvalidState("conversation inactive or locked"));
        }
        if self
            .member_repo
            .get_live_in_tx(&mut *tx, conversation_id, receiver)
            .await?
            .is_some()
        {
            return Err(CoordError::Conflict("receiver already a member"));
        }
        if self
            .invite_repo
            .has_pending_in_tx(&mut *tx, conversation_id, receiver)
            .await?
        {
            return Err(CoordError::Conflict("pending invite already exists"));
        }
        if self.block_repo.is_blocked_either(sender, receiver).await? {
            return Err(CoordError::Forbidden("block relation exists"));
        }
        let sender_member = self
            .member_repo
            .get_live_in_tx(&mut *tx, conversation_id, sender)
            .await?
            .ok_or(CoordError::Forbidden("sender is not a member"))?;
        if sender_member.status != MemberStatus::Owner {
            return Err(CoordError::Forbidden("only the owner may invite"));
        }

        // Display fields are frozen into the row here; the feed never joins
        // back to the identity service.
        let sender_summary = self.identity_client.get_summary(sender).await?;
        let receiver_summary = self.identity_client.get_summary(receiver).await?;

        let now = Utc::now();
        let invite = InviteRecord {
            invite_id: InviteId(Uuid::new_v4()),
            conversation_id,
            conversation_name: conversation.name.clone(),
            sender_id: sender,
            sender_name: sender_summary.display_name,
            sender_avatar: sender_summary.avatar_url,
            receiver_id: receiver,
            receiver_name: receiver_summary.display_name,
            receiver_avatar: receiver_summary.avatar_url,
            note,
            status: InviteStatus::Pending,
            requested_at: now,
            responded_at: None,
        };
        self.invite_repo.insert_in_tx(&mut *tx, &invite).await?;

        let event = OutboxEvent::new(
            EventType::InviteCreated,
            Some(conversation_id.0),
            vec![receiver],
            &DomainEvent::InviteCreated(InviteCreated {
                invite_id: invite.invite_id,
                conversation_id,
                conversation_name: conversation.name.clone(),
                kind: conversation.kind,
                sender_id: sender,
                sender_name: invite.sender_name.clone(),
                receiver_id: receiver,
                receiver_name: invite.receiver_name.clone(),
                note: invite.note.clone(),
                requested_at: now,
            }),
        )
        .map_err(|e| CoordError::store("compose invite.created", e))?;
        self.outbox_repo
            .enqueue_in_tx(&mut *tx, &event)
            .await
            .map_err(|e| CoordError::store("enqueue invite.created", e))?;

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))?;

        Ok(invite)
    }

    async fn respond_to_invite(
        &self,
        invite_id: InviteId,
        receiver: UserId,
        decision: InviteDecision,
    ) -> Result<InviteRecord, CoordError> {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        let mut invite = self
            .invite_repo
            .get_for_receiver_in_tx(&mut *tx, invite_id, receiver)
            .await?
            .ok_or(CoordError::NotFound)?;
        if invite.status.is_terminal() {
            return Err(CoordError::InvalidState("invite already responded to"));
        }
        let conversation = self
            .conversation_repo
            .get_in_tx(&mut *tx, invite.conversation_id)
            .await?
            .ok_or(CoordError::NotFound)?;

        let now = Utc::now();
        let target = match decision {
            InviteDecision::Accept => InviteStatus::Accepted,
            InviteDecision::Decline => InviteStatus::Rejected,
        };
        debug_assert!(invite.status.can_transition_to(target));

        // Checked before the flip so a refused accept leaves the invite
        // Pending instead of half-responded.
        if matches!(decision, InviteDecision::Accept) && !conversation.active {
            return Err(CoordError::InvalidState("conversation no longer active"));
        }

        // Guarded flip: a racing second response sees zero affected rows.
        let affected = self
            .invite_repo
            .mark_responded_in_tx(&mut *tx, invite_id, target, now)
            .await?;
        if affected == 0 {
            return Err(CoordError::InvalidState("invite already responded to"));
        }

        match decision {
            InviteDecision::Accept => {
                // Fresh row every time; a removed-then-reinvited member does
                // not resurrect the old one.
                if self
                    .member_repo
                    .get_live_in_tx(&mut *tx, invite.conversation_id, receiver)
                    .await?
                    .is_none()
                {
                    let member = MemberRecord {
                        member_id: MemberId(Uuid::new_v4()),
                        conversation_id: invite.conversation_id,
                        user_id: receiver,
                        status: MemberStatus::Member,
                        display_name: invite.receiver_name.clone(),
                        avatar_url: invite.receiver_avatar.clone(),
                        joined_at: now,
                        updated_at: now,
                    };
                    self.member_repo.insert_in_tx(&mut *tx, &member).await?;
                }
                self.conversation_repo
                    .touch_activity_in_tx(
                        &mut *tx,
                        invite.conversation_id,
                        now,
                        &format!("{} joined", invite.receiver_name),
                    )
                    .await?;

                let members = self
                    .member_repo
                    .list_live_in_tx(&mut *tx, invite.conversation_id)
                    .await?;
                let receivers = members.iter().map(|m| m.user_id).collect();
                let event = OutboxEvent::new(
                    EventType::ConversationJoined,
                    Some(invite.conversation_id.0),
                    receivers,
                    &DomainEvent::ConversationJoined(ConversationJoined {
                        conversation_id: invite.conversation_id,
                        conversation_name: conversation.name.clone(),
                        kind: conversation.kind,
                        user_id: receiver,
                        joined_at: now,
                    }),
                )
                .map_err(|e| CoordError::store("compose conversation.joined", e))?;
                self.outbox_repo
                    .enqueue_in_tx(&mut *tx, &event)
                    .await
                    .map_err(|e| CoordError::store("enqueue conversation.joined", e))?;
            }
            InviteDecision::Decline => {
                let event = OutboxEvent::new(
                    EventType::InviteDeclined,
                    Some(invite.conversation_id.0),
                    vec![invite.sender_id],
                    &DomainEvent::InviteDeclined(InviteDeclined {
                        invite_id,
                        conversation_id: invite.conversation_id,
                        conversation_name: conversation.name.clone(),
                        owner_id: conversation.created_by,
                        user_id: receiver,
                        declined_at: now,
                    }),
                )
                .map_err(|e| CoordError::store("compose invite.declined", e))?;
                self.outbox_repo
                    .enqueue_in_tx(&mut *tx, &event)
                    .await
                    .map_err(|e| CoordError::store("enqueue invite.declined", e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))?;

        invite.status = target;
        invite.responded_at = Some(now);
        Ok(invite)
    }

    async fn list_invites(
        &self,
        receiver: UserId,
        page_size: PageSize,
        after: Option<Cursor>,
        filter: InviteFilter,
    ) -> Result<Page<InviteRecord>, CoordError> {
        let rows = self
            .invite_repo
            .list_for_receiver(receiver, page_size.0 + 1, after, &filter)
            .await?;
        Ok(Page::from_rows(rows, page_size.0 as usize, |i| {
            Cursor::new(i.requested_at, i.invite_id.0)
        }))
    }
}
