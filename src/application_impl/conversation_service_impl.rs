use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub struct RealConversationService {
    conversation_repo: Arc<dyn ConversationRepo>,
    member_repo: Arc<dyn MemberRepo>,
    invite_repo: Arc<dyn InviteRepo>,
    block_repo: Arc<dyn BlockRepo>,
    upload_intent_repo: Arc<dyn UploadIntentRepo>,
    outbox_repo: Arc<dyn OutboxRepo>,
    identity_client: Arc<dyn IdentityClient>,
    object_storage: Arc<dyn ObjectStorageClient>,
    invite_service: Arc<dyn InviteService>,
    tx_manager: Arc<dyn TxManager>,
    /// Completed objects become `{base}/{bucket}/{key}`.
    public_file_base_url: String,
}

impl RealConversationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepo>,
        member_repo: Arc<dyn MemberRepo>,
        invite_repo: Arc<dyn InviteRepo>,
        block_repo: Arc<dyn BlockRepo>,
        upload_intent_repo: Arc<dyn UploadIntentRepo>,
        outbox_repo: Arc<dyn OutboxRepo>,
        identity_client: Arc<dyn IdentityClient>,
        object_storage: Arc<dyn ObjectStorageClient>,
        invite_service: Arc<dyn InviteService>,
        tx_manager: Arc<dyn TxManager>,
        public_file_base_url: String,
    ) -> Self {
        Self {
            conversation_repo,
            member_repo,
            invite_repo,
            block_repo,
            upload_intent_repo,
            outbox_repo,
            identity_client,
            object_storage,
            invite_service,
            tx_manager,
            public_file_base_url,
        }
    }

    fn member_row(summary: &UserSummary, conversation_id: ConversationId, status: MemberStatus, now: chrono::DateTime<Utc>) -> MemberRecord {
        MemberRecord {
            member_id: MemberId(Uuid::new_v4()),
            conversation_id,
            user_id: summary.user_id,
            status,
            display_name: summary.display_name.clone(),
            avatar_url: summary.avatar_url.clone(),
            joined_at: now,
            updated_at: now,
        }
    }

    /// Shared preamble for group mutations: the conversation must exist, be
    /// group-like, active and unlocked, and the actor must hold Owner.
    async fn require_owner_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        conversation_id: ConversationId,
        actor: UserId,
    ) -> Result<(ConversationRecord, MemberRecord), CoordError> {
        let conversation = self
            .conversation_repo
            .get_in_tx(tx, conversation_id)
            .await?
            .ok_or(CoordError::NotFound)?;
        if !conversation.kind.is_grouplike() {
            return Err(CoordError::InvalidState("not a group conversation"));
        }
        if !conversation.accepts_membership_changes() {
            return Err(CoordError::InvalidState("conversation inactive or locked"));
        }
        let actor_member = self
            .member_repo
            .get_live_in_tx(tx, conversation_id, actor)
            .await?
            .ok_or(CoordError::Forbidden("not a member"))?;
        if actor_member.status != MemberStatus::Owner {
            return Err(CoordError::Forbidden("owner status required"));
        }
        Ok((conversation, actor_member))
    }
}

#[async_trait::async_trait]
impl ConversationService for RealConversationService {
    async fn create_direct(
        &self,
        me: UserId,
        other: UserId,
    ) -> Result<ConversationId, CoordError> {
        if me == other {
            return Err(CoordError::InvalidState(
                "cannot start a direct conversation with yourself",
            ));
        }
        if self.block_repo.is_blocked_either(me, other).await? {
            return Err(CoordError::Forbidden("block relation exists"));
        }

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        let pair = UserPair::new(me, other);
        let proposed = ConversationId(Uuid::new_v4());
        match self
            .conversation_repo
            .claim_direct_pair_in_tx(&mut *tx, &pair, proposed)
            .await?
        {
            DirectClaim::Won => {
                let now = Utc::now();
                let record = ConversationRecord {
                    conversation_id: proposed,
                    kind: ConversationKind::Direct,
                    name: None,
                    avatar_url: None,
                    created_by: me,
                    locked: false,
                    active: true,
                    last_activity_at: Some(now),
                    last_activity_summary: None,
                    created_at: now,
                    updated_at: now,
                };
                self.conversation_repo.insert_in_tx(&mut *tx, &record).await?;

                // Symmetric ownership for 1:1.
                let me_summary = self.identity_client.get_summary(me).await?;
                let other_summary = self.identity_client.get_summary(other).await?;
                self.member_repo
                    .insert_in_tx(
                        &mut *tx,
                        &Self::member_row(&me_summary, proposed, MemberStatus::Owner, now),
                    )
                    .await?;
                self.member_repo
                    .insert_in_tx(
                        &mut *tx,
                        &Self::member_row(&other_summary, proposed, MemberStatus::Owner, now),
                    )
                    .await?;

                let event = OutboxEvent::new(
                    EventType::ConversationCreated,
                    Some(proposed.0),
                    vec![other],
                    &DomainEvent::ConversationCreated(ConversationCreated {
                        conversation_id: proposed,
                        conversation_name: None,
                        kind: ConversationKind::Direct,
                        creator_id: me,
                        member_ids: vec![me, other],
                        created_at: now,
                    }),
                )
                .map_err(|e| CoordError::store("compose conversation.created", e))?;
                self.outbox_repo
                    .enqueue_in_tx(&mut *tx, &event)
                    .await
                    .map_err(|e| CoordError::store("enqueue conversation.created", e))?;

                tx.commit()
                    .await
                    .map_err(|e| CoordError::store("commit", e))?;
                Ok(proposed)
            }
            DirectClaim::Existing(existing) => {
                // Retried or raced; the pair already has its conversation.
                tx.rollback()
                    .await
                    .map_err(|e| CoordError::store("rollback", e))?;
                Ok(existing)
            }
        }
    }

    async fn create_group(
        &self,
        creator: UserId,
        name: &str,
        kind: ConversationKind,
        initial_member_ids: Vec<UserId>,
    ) -> Result<ConversationRecord, CoordError> {
        if !kind.is_grouplike() {
            return Err(CoordError::InvalidState(
                "direct conversations are created via create_direct",
            ));
        }
        if name.trim().is_empty() {
            return Err(CoordError::InvalidState("group name required"));
        }
        let creator_summary = self.identity_client.get_summary(creator).await?;
        if kind == ConversationKind::Public && !creator_summary.is_admin() {
            return Err(CoordError::Forbidden(
                "only admins may create public conversations",
            ));
        }

        let mut invitees: Vec<UserId> = initial_member_ids;
        invitees.retain(|id| *id != creator);
        invitees.sort();
        invitees.dedup();

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        let now = Utc::now();
        let record = ConversationRecord {
            conversation_id: ConversationId(Uuid::new_v4()),
            kind,
            name: Some(name.to_owned()),
            avatar_url: None,
            created_by: creator,
            locked: false,
            active: true,
            last_activity_at: Some(now),
            last_activity_summary: None,
            created_at: now,
            updated_at: now,
        };
        self.conversation_repo.insert_in_tx(&mut *tx, &record).await?;
        self.member_repo
            .insert_in_tx(
                &mut *tx,
                &Self::member_row(&creator_summary, record.conversation_id, MemberStatus::Owner, now),
            )
            .await?;

        // One batch event with the full initial member-id set; downstream
        // fans out a single notification instead of one per member.
        let event = OutboxEvent::new(
            EventType::ConversationCreated,
            Some(record.conversation_id.0),
            invitees.clone(),
            &DomainEvent::ConversationCreated(ConversationCreated {
                conversation_id: record.conversation_id,
                conversation_name: record.name.clone(),
                kind,
                creator_id: creator,
                member_ids: invitees.clone(),
                created_at: now,
            }),
        )
        .map_err(|e| CoordError::store("compose conversation.created", e))?;
        self.outbox_repo
            .enqueue_in_tx(&mut *tx, &event)
            .await
            .map_err(|e| CoordError::store("enqueue conversation.created", e))?;

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))?;

        // Invites go through the engine so every precondition (blocklist,
        // duplicate pending, existing member) holds here too. A member that
        // fails its check degrades to a warning; the group itself stands.
        for invitee in invitees {
            if let Err(e) = self
                .invite_service
                .create_invite(record.conversation_id, creator, invitee, None)
                .await
            {
                tracing::warn!(
                    conversation_id = %record.conversation_id,
                    %invitee,
                    "initial invite skipped: {e}"
                );
            }
        }

        Ok(record)
    }

    async fn remove_member(
        &self,
        conversation_id: ConversationId,
        acting_owner: UserId,
        target: UserId,
    ) -> Result<(), CoordError> {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        let (conversation, _) = self
            .require_owner_in_tx(&mut *tx, conversation_id, acting_owner)
            .await?;
        if acting_owner == target {
            return Err(CoordError::InvalidState("cannot remove yourself"));
        }

        let target_member = self
            .member_repo
            .get_live_in_tx(&mut *tx, conversation_id, target)
            .await?
            .ok_or(CoordError::NotFound)?;
        if target_member.status != MemberStatus::Member {
            return Err(CoordError::InvalidState("only plain members can be removed"));
        }

        let now = Utc::now();
        self.member_repo
            .transition_in_tx(
                &mut *tx,
                target_member.member_id,
                MemberStatus::Member,
                MemberStatus::Removed,
                now,
            )
            .await?;
        self.conversation_repo
            .touch_activity_in_tx(
                &mut *tx,
                conversation_id,
                now,
                &format!("{} was removed", target_member.display_name),
            )
            .await?;

        let mut receivers: Vec<UserId> = self
            .member_repo
            .list_live_in_tx(&mut *tx, conversation_id)
            .await?
            .iter()
            .map(|m| m.user_id)
            .collect();
        receivers.push(target);
        let event = OutboxEvent::new(
            EventType::MemberRemoved,
            Some(conversation_id.0),
            receivers,
            &DomainEvent::MemberRemoved(MemberRemoved {
                conversation_id,
                conversation_name: conversation.name.clone(),
                user_id: target,
                removed_at: now,
            }),
        )
        .map_err(|e| CoordError::store("compose member.removed", e))?;
        self.outbox_repo
            .enqueue_in_tx(&mut *tx, &event)
            .await
            .map_err(|e| CoordError::store("enqueue member.removed", e))?;

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))
    }

    async fn leave_conversation(
        &self,
        conversation_id: ConversationId,
        user: UserId,
    ) -> Result<(), CoordError> {
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
        if !conversation.kind.is_grouplike() {
            return Err(CoordError::InvalidState("not a group conversation"));
        }
        if !conversation.accepts_membership_changes() {
            return Err(CoordError::InvalidState("conversation inactive or locked"));
        }
        let member = self
            .member_repo
            .get_live_in_tx(&mut *tx, conversation_id, user)
            .await?
            .ok_or(CoordError::Forbidden("not a member"))?;
        if member.status == MemberStatus::Owner {
            return Err(CoordError::Forbidden(
                "owner cannot leave; transfer ownership or dissolve",
            ));
        }

        let now = Utc::now();
        self.member_repo
            .transition_in_tx(
                &mut *tx,
                member.member_id,
                MemberStatus::Member,
                MemberStatus::Outed,
                now,
            )
            .await?;
        // No fan-out to the leaver; the remaining members see the summary
        // change through their conversation feed.
        self.conversation_repo
            .touch_activity_in_tx(
                &mut *tx,
                conversation_id,
                now,
                &format!("{} left", member.display_name),
            )
            .await?;

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))
    }

    async fn dissolve(
        &self,
        conversation_id: ConversationId,
        acting_owner: UserId,
    ) -> Result<(), CoordError> {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        let (conversation, _) = self
            .require_owner_in_tx(&mut *tx, conversation_id, acting_owner)
            .await?;

        let prior_members: Vec<UserId> = self
            .member_repo
            .list_live_in_tx(&mut *tx, conversation_id)
            .await?
            .iter()
            .map(|m| m.user_id)
            .collect();

        let now = Utc::now();
        self.conversation_repo
            .set_inactive_in_tx(&mut *tx, conversation_id, now)
            .await?;
        self.member_repo
            .remove_all_live_in_tx(&mut *tx, conversation_id, now)
            .await?;
        // Pending invites become moot, not rejected.
        self.invite_repo
            .delete_pending_for_conversation_in_tx(&mut *tx, conversation_id)
            .await?;

        // Single broadcast with the full prior member list; downstream does
        // not look membership up again (the rows are already Removed).
        let event = OutboxEvent::new(
            EventType::GroupDissolved,
            Some(conversation_id.0),
            prior_members.clone(),
            &DomainEvent::GroupDissolved(GroupDissolved {
                conversation_id,
                conversation_name: conversation.name.clone(),
                owner_id: acting_owner,
                member_ids: prior_members,
                dissolved_at: now,
            }),
        )
        .map_err(|e| CoordError::store("compose group.dissolved", e))?;
        self.outbox_repo
            .enqueue_in_tx(&mut *tx, &event)
            .await
            .map_err(|e| CoordError::store("enqueue group.dissolved", e))?;

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))
    }

    async fn request_avatar_upload(
        &self,
        conversation_id: ConversationId,
        actor: UserId,
        file_name: &str,
        content_type: &str,
        size_bytes: u64,
    ) -> Result<UploadHandle, CoordError> {
        // Permission checks first, collaborator call second, so we never
        // issue a handle we would refuse to record.
        {
            let mut tx = self
                .tx_manager
                .begin()
                .await
                .map_err(|e| CoordError::store("begin", e))?;
            self.require_owner_in_tx(&mut *tx, conversation_id, actor)
                .await?;
            tx.rollback()
                .await
                .map_err(|e| CoordError::store("rollback", e))?;
        }

        let handle = self
            .object_storage
            .issue_upload_handle(
                file_name,
                content_type,
                size_bytes,
                BusinessType::ConversationAvatar,
                conversation_id.0,
            )
            .await
            .map_err(|e| CoordError::store("issue upload handle", e))?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;
        let intent = UploadIntent {
            handle_id: handle.handle_id,
            business_type: BusinessType::ConversationAvatar,
            business_id: conversation_id.0,
            requested_by: actor,
            status: UploadIntentStatus::Pending,
            created_at: Utc::now(),
        };
        self.upload_intent_repo.insert_in_tx(&mut *tx, &intent).await?;
        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))?;

        Ok(handle)
    }

    async fn apply_upload_completed(
        &self,
        notice: &FileUploadedNotice,
    ) -> Result<(), CoordError> {
        // The topic is shared; notices for uploads we do not own are not
        // errors, they are simply not ours.
        let Ok(notice_type) = BusinessType::from_str(&notice.business_type) else {
            tracing::debug!(
                business_type = %notice.business_type,
                "ignoring foreign upload notice"
            );
            return Ok(());
        };
        let Ok(raw_id) = Uuid::parse_str(&notice.business_id) else {
            tracing::warn!(business_id = %notice.business_id, "unparseable business id");
            return Ok(());
        };

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| CoordError::store("begin", e))?;

        // The notice only binds through a phase-1 intent we issued: same
        // handle, same business target, still open. Anything else is a
        // forgery or a redelivery and changes nothing.
        let intent = match self
            .upload_intent_repo
            .get_in_tx(&mut *tx, notice.handle_id)
            .await?
        {
            Some(i) => i,
            None => {
                tracing::warn!(handle_id = %notice.handle_id, "upload notice without recorded intent");
                tx.rollback()
                    .await
                    .map_err(|e| CoordError::store("rollback", e))?;
                return Ok(());
            }
        };
        if intent.status != UploadIntentStatus::Pending {
            // Already applied or discarded; redelivery.
            tx.rollback()
                .await
                .map_err(|e| CoordError::store("rollback", e))?;
            return Ok(());
        }
        if intent.business_type != notice_type || intent.business_id != raw_id {
            tracing::warn!(
                handle_id = %notice.handle_id,
                business_id = %notice.business_id,
                "upload notice disagrees with recorded intent"
            );
            tx.rollback()
                .await
                .map_err(|e| CoordError::store("rollback", e))?;
            return Ok(());
        }
        let conversation_id = ConversationId(intent.business_id);

        match self
            .conversation_repo
            .get_in_tx(&mut *tx, conversation_id)
            .await?
        {
            Some(c) if c.kind.is_grouplike() && c.active => {}
            _ => {
                // Dissolved (or never existed) between phase 1 and phase 2.
                tracing::warn!(%conversation_id, "discarding avatar notice for ineligible conversation");
                self.upload_intent_repo
                    .mark_in_tx(&mut *tx, notice.handle_id, UploadIntentStatus::Discarded)
                    .await?;
                tx.commit()
                    .await
                    .map_err(|e| CoordError::store("commit", e))?;
                return Ok(());
            }
        };

        let avatar_url = format!(
            "{}/{}/{}",
            self.public_file_base_url, notice.bucket, notice.object_key
        );
        let now = Utc::now();
        self.conversation_repo
            .set_avatar_in_tx(&mut *tx, conversation_id, &avatar_url, now)
            .await?;
        self.upload_intent_repo
            .mark_in_tx(&mut *tx, notice.handle_id, UploadIntentStatus::Completed)
            .await?;

        let receivers = self
            .member_repo
            .list_live_in_tx(&mut *tx, conversation_id)
            .await?
            .iter()
            .map(|m| m.user_id)
            .collect();
        let event = OutboxEvent::new(
            EventType::ConversationAvatarUpdated,
            Some(conversation_id.0),
            receivers,
            &DomainEvent::ConversationAvatarUpdated(ConversationAvatarUpdated {
                conversation_id,
                avatar_url,
                updated_at: now,
            }),
        )
        .map_err(|e| CoordError::store("compose conversation.avatar.updated", e))?;
        self.outbox_repo
            .enqueue_in_tx(&mut *tx, &event)
            .await
            .map_err(|e| CoordError::store("enqueue conversation.avatar.updated", e))?;

        tx.commit()
            .await
            .map_err(|e| CoordError::store("commit", e))
    }

    async fn list_conversations(
        &self,
        user: UserId,
        page_size: PageSize,
        after: Option<Cursor>,
        filter: ConversationFilter,
    ) -> Result<Page<ConversationRecord>, CoordError> {
        let rows = self
            .conversation_repo
            .list_for_user(user, page_size.0 + 1, after, &filter)
            .await?;
        Ok(Page::from_rows(rows, page_size.0 as usize, |c| {
            Cursor::new(
                c.last_activity_at.unwrap_or(c.created_at),
                c.conversation_id.0,
            )
        }))
    }
}
