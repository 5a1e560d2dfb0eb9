mod common;

use colloquy::application_port::*;
use colloquy::domain_model::*;
use colloquy::domain_port::EventType;
use common::TestEnv;

#[tokio::test]
async fn invite_accept_makes_member_and_fans_out() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let guest = env.user("grace");

    let conversation = env
        .conversation_service
        .create_group(owner, "compilers", ConversationKind::Group, vec![])
        .await
        .unwrap();

    let invite = env
        .invite_service
        .create_invite(conversation.conversation_id, owner, guest, Some("join us".into()))
        .await
        .unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);
    assert_eq!(invite.receiver_name, "grace");

    let created = env.events_of(EventType::InviteCreated);
    assert_eq!(created.len(), 1);
    assert_eq!(TestEnv::receivers_of(&created[0]), vec![guest]);

    let responded = env
        .invite_service
        .respond_to_invite(invite.invite_id, guest, InviteDecision::Accept)
        .await
        .unwrap();
    assert_eq!(responded.status, InviteStatus::Accepted);
    assert!(responded.responded_at.is_some());

    // The new member can post; non-members still cannot.
    env.message_service
        .send_message(conversation.conversation_id, guest, "hello")
        .await
        .unwrap();

    let joined = env.events_of(EventType::ConversationJoined);
    assert_eq!(joined.len(), 1);
    let receivers = TestEnv::receivers_of(&joined[0]);
    assert!(receivers.contains(&owner));
    assert!(receivers.contains(&guest));
}

#[tokio::test]
async fn invite_decline_notifies_sender_only() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let guest = env.user("grace");

    let conversation = env
        .conversation_service
        .create_group(owner, "archive", ConversationKind::Group, vec![])
        .await
        .unwrap();
    let invite = env
        .invite_service
        .create_invite(conversation.conversation_id, owner, guest, None)
        .await
        .unwrap();

    env.invite_service
        .respond_to_invite(invite.invite_id, guest, InviteDecision::Decline)
        .await
        .unwrap();

    let declined = env.events_of(EventType::InviteDeclined);
    assert_eq!(declined.len(), 1);
    assert_eq!(TestEnv::receivers_of(&declined[0]), vec![owner]);

    // Declining does not grant membership.
    let err = env
        .message_service
        .send_message(conversation.conversation_id, guest, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));
}

#[tokio::test]
async fn second_response_is_rejected() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let guest = env.user("grace");

    let conversation = env
        .conversation_service
        .create_group(owner, "ops", ConversationKind::Group, vec![])
        .await
        .unwrap();
    let invite = env
        .invite_service
        .create_invite(conversation.conversation_id, owner, guest, None)
        .await
        .unwrap();

    env.invite_service
        .respond_to_invite(invite.invite_id, guest, InviteDecision::Accept)
        .await
        .unwrap();
    let err = env
        .invite_service
        .respond_to_invite(invite.invite_id, guest, InviteDecision::Decline)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_)));
}

#[tokio::test]
async fn only_the_receiver_may_respond() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let guest = env.user("grace");
    let stranger = env.user("mallory");

    let conversation = env
        .conversation_service
        .create_group(owner, "private", ConversationKind::Group, vec![])
        .await
        .unwrap();
    let invite = env
        .invite_service
        .create_invite(conversation.conversation_id, owner, guest, None)
        .await
        .unwrap();

    // Scoped lookup: someone else's invite id behaves like a missing one.
    let err = env
        .invite_service
        .respond_to_invite(invite.invite_id, stranger, InviteDecision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::NotFound));
}

#[tokio::test]
async fn create_invite_precondition_order() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");
    let outsider = env.user("trent");
    let blocked = env.user("mallory");

    let conversation_id = env.group_with_members(owner, "team", &[member]).await;

    // Receiver already in.
    let err = env
        .invite_service
        .create_invite(conversation_id, owner, member, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Conflict("receiver already a member")));

    // Duplicate pending.
    env.invite_service
        .create_invite(conversation_id, owner, outsider, None)
        .await
        .unwrap();
    let err = env
        .invite_service
        .create_invite(conversation_id, owner, outsider, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Conflict("pending invite already exists")));

    // Block relation, either direction.
    env.block_repo.insert(blocked, owner).await.unwrap();
    let err = env
        .invite_service
        .create_invite(conversation_id, owner, blocked, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden("block relation exists")));

    // Non-owner sender.
    let err = env
        .invite_service
        .create_invite(conversation_id, member, env.user("newcomer"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));

    // Unknown conversation outranks everything.
    let err = env
        .invite_service
        .create_invite(ConversationId(uuid::Uuid::new_v4()), owner, outsider, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::NotFound));
}

#[tokio::test]
async fn accept_after_dissolve_flips_but_grants_nothing() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let guest = env.user("grace");

    let conversation = env
        .conversation_service
        .create_group(owner, "ephemeral", ConversationKind::Group, vec![])
        .await
        .unwrap();
    let invite = env
        .invite_service
        .create_invite(conversation.conversation_id, owner, guest, None)
        .await
        .unwrap();

    env.conversation_service
        .dissolve(conversation.conversation_id, owner)
        .await
        .unwrap();

    // Dissolution deletes pending invites, so the response finds nothing.
    let err = env
        .invite_service
        .respond_to_invite(invite.invite_id, guest, InviteDecision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::NotFound));
}

#[tokio::test]
async fn reinvited_member_gets_a_fresh_row() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");

    let conversation_id = env.group_with_members(owner, "revolving", &[member]).await;

    env.conversation_service
        .remove_member(conversation_id, owner, member)
        .await
        .unwrap();

    let invite = env
        .invite_service
        .create_invite(conversation_id, owner, member, None)
        .await
        .unwrap();
    env.invite_service
        .respond_to_invite(invite.invite_id, member, InviteDecision::Accept)
        .await
        .unwrap();

    // Two historic rows for the user, exactly one live.
    let rows: Vec<_> = env
        .store
        .members
        .lock()
        .unwrap()
        .values()
        .filter(|m| m.user_id == member)
        .cloned()
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|m| m.status.is_live()).count(), 1);
}

#[tokio::test]
async fn refused_accept_leaves_invite_pending() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let guest = env.user("grace");

    let conversation = env
        .conversation_service
        .create_group(owner, "winddown", ConversationKind::Group, vec![])
        .await
        .unwrap();
    let invite = env
        .invite_service
        .create_invite(conversation.conversation_id, owner, guest, None)
        .await
        .unwrap();

    // The conversation goes inactive underneath the open invite.
    env.store
        .conversations
        .lock()
        .unwrap()
        .get_mut(&conversation.conversation_id)
        .unwrap()
        .active = false;

    let err = env
        .invite_service
        .respond_to_invite(invite.invite_id, guest, InviteDecision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::InvalidState(_)));

    // The invite did not half-respond: still Pending, no join fanned out.
    let stored = env
        .store
        .invites
        .lock()
        .unwrap()
        .get(&invite.invite_id)
        .cloned()
        .unwrap();
    assert_eq!(stored.status, InviteStatus::Pending);
    assert!(stored.responded_at.is_none());
    assert!(env.events_of(EventType::ConversationJoined).is_empty());
}
