mod common;

use colloquy::application_port::*;
use colloquy::domain_model::*;
use colloquy::domain_port::EventType;
use common::TestEnv;

#[tokio::test]
async fn direct_conversation_is_one_per_pair() {
    let env = TestEnv::new();
    let a = env.user("ada");
    let b = env.user("grace");

    let first = env.conversation_service.create_direct(a, b).await.unwrap();
    // Retried by either side, in either order: same conversation.
    let again = env.conversation_service.create_direct(a, b).await.unwrap();
    let reversed = env.conversation_service.create_direct(b, a).await.unwrap();
    assert_eq!(first, again);
    assert_eq!(first, reversed);

    // Both parties hold Owner and can post immediately.
    env.message_service.send_message(first, a, "hi").await.unwrap();
    env.message_service.send_message(first, b, "hello").await.unwrap();

    let created = env.events_of(EventType::ConversationCreated);
    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn direct_conversation_rejects_self_and_blocked_pairs() {
    let env = TestEnv::new();
    let a = env.user("ada");
    let b = env.user("grace");

    let err = env.conversation_service.create_direct(a, a).await.unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_)));

    env.block_repo.insert(b, a).await.unwrap();
    let err = env.conversation_service.create_direct(a, b).await.unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));
}

#[tokio::test]
async fn group_creation_invites_instead_of_enrolling() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let invitee = env.user("grace");

    let conversation = env
        .conversation_service
        .create_group(owner, "lab", ConversationKind::Group, vec![invitee, invitee, owner])
        .await
        .unwrap();

    // Creator is deduplicated out of the invite list; invitee listed twice
    // gets one invite.
    let page = env
        .invite_service
        .list_invites(invitee, PageSize(10), None, InviteFilter::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].status, InviteStatus::Pending);

    // Until acceptance the invitee is not a member.
    let err = env
        .message_service
        .send_message(conversation.conversation_id, invitee, "early")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));
}

#[tokio::test]
async fn public_conversations_are_admin_only() {
    let env = TestEnv::new();
    let plain = env.user("ada");
    let admin = env.admin("root");

    let err = env
        .conversation_service
        .create_group(plain, "town square", ConversationKind::Public, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));

    let conversation = env
        .conversation_service
        .create_group(admin, "town square", ConversationKind::Public, vec![])
        .await
        .unwrap();
    assert_eq!(conversation.kind, ConversationKind::Public);
}

#[tokio::test]
async fn group_name_is_required() {
    let env = TestEnv::new();
    let owner = env.user("ada");

    let err = env
        .conversation_service
        .create_group(owner, "   ", ConversationKind::Group, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_)));
}

#[tokio::test]
async fn remove_member_is_owner_only_and_owner_proof() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");
    let other = env.user("trent");

    let conversation_id = env.group_with_members(owner, "crew", &[member, other]).await;

    // A plain member cannot remove anyone.
    let err = env
        .conversation_service
        .remove_member(conversation_id, member, other)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));

    // The owner cannot be targeted, nor remove themselves.
    let err = env
        .conversation_service
        .remove_member(conversation_id, member, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_) | CoordError::Forbidden(_)));
    let err = env
        .conversation_service
        .remove_member(conversation_id, owner, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_)));

    env.conversation_service
        .remove_member(conversation_id, owner, member)
        .await
        .unwrap();

    // Removed members lose posting rights.
    let err = env
        .message_service
        .send_message(conversation_id, member, "still here?")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));

    // Removal notice reaches the removed user plus the remaining members.
    let removed = env.events_of(EventType::MemberRemoved);
    assert_eq!(removed.len(), 1);
    let receivers = TestEnv::receivers_of(&removed[0]);
    assert!(receivers.contains(&member));
    assert!(receivers.contains(&owner));
    assert!(receivers.contains(&other));
}

#[tokio::test]
async fn owner_cannot_leave_but_members_can() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");

    let conversation_id = env.group_with_members(owner, "exit", &[member]).await;

    let err = env
        .conversation_service
        .leave_conversation(conversation_id, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));

    env.conversation_service
        .leave_conversation(conversation_id, member)
        .await
        .unwrap();
    let err = env
        .message_service
        .send_message(conversation_id, member, "back?")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));

    // Leaving fans nothing out.
    assert!(env.events_of(EventType::MemberRemoved).is_empty());
}

#[tokio::test]
async fn dissolve_clears_members_and_pending_invites() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");
    let invited = env.user("trent");

    let conversation_id = env.group_with_members(owner, "sunset", &[member]).await;
    env.invite_service
        .create_invite(conversation_id, owner, invited, None)
        .await
        .unwrap();

    env.conversation_service
        .dissolve(conversation_id, owner)
        .await
        .unwrap();

    // Nobody can post, not even the former owner.
    for user in [owner, member] {
        let err = env
            .message_service
            .send_message(conversation_id, user, "anyone?")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoordError::InvalidState(_) | CoordError::Forbidden(_)
        ));
    }

    // A second dissolve finds the conversation already inactive.
    let err = env
        .conversation_service
        .dissolve(conversation_id, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_)));

    // One broadcast carrying the full prior member list.
    let dissolved = env.events_of(EventType::GroupDissolved);
    assert_eq!(dissolved.len(), 1);
    let receivers = TestEnv::receivers_of(&dissolved[0]);
    assert!(receivers.contains(&owner));
    assert!(receivers.contains(&member));
    assert!(!receivers.contains(&invited));
}

#[tokio::test]
async fn leave_is_group_only() {
    let env = TestEnv::new();
    let a = env.user("ada");
    let b = env.user("grace");

    let direct = env.conversation_service.create_direct(a, b).await.unwrap();
    let err = env
        .conversation_service
        .leave_conversation(direct, a)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_)));
}

#[tokio::test]
async fn racing_direct_creations_converge_on_one_conversation() {
    let env = TestEnv::new();
    let a = env.user("ada");
    let b = env.user("grace");

    let svc = &env.conversation_service;
    let (r1, r2, r3, r4) = tokio::join!(
        svc.create_direct(a, b),
        svc.create_direct(b, a),
        svc.create_direct(a, b),
        svc.create_direct(b, a),
    );
    let ids = [r1.unwrap(), r2.unwrap(), r3.unwrap(), r4.unwrap()];
    assert!(ids.iter().all(|id| *id == ids[0]));

    // One claim won; the losers rode along on the existing conversation.
    assert_eq!(env.store.conversations.lock().unwrap().len(), 1);
    assert_eq!(env.store.direct_pairs.lock().unwrap().len(), 1);
    assert_eq!(env.events_of(EventType::ConversationCreated).len(), 1);
}

#[tokio::test]
async fn remove_from_unknown_conversation_is_not_found() {
    let env = TestEnv::new();
    let user = env.user("ada");
    let ghost = ConversationId(uuid::Uuid::new_v4());

    // Existence is checked before the self-removal rule.
    let err = env
        .conversation_service
        .remove_member(ghost, user, user)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::NotFound));
}
