mod common;

use colloquy::application_port::*;
use colloquy::domain_model::*;
use colloquy::domain_port::EventType;
use common::{TestEnv, FILE_BASE_URL};

fn notice_for(handle: &UploadHandle, conversation_id: ConversationId) -> FileUploadedNotice {
    FileUploadedNotice {
        handle_id: handle.handle_id,
        business_type: "CONVERSATION_AVATAR".into(),
        business_id: conversation_id.to_string(),
        bucket: "avatars".into(),
        object_key: "2026/08/cat.png".into(),
        content_type: "image/png".into(),
    }
}

#[tokio::test]
async fn avatar_flow_issues_then_applies() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");
    let conversation_id = env.group_with_members(owner, "art", &[member]).await;

    let handle = env
        .conversation_service
        .request_avatar_upload(conversation_id, owner, "cat.png", "image/png", 4096)
        .await
        .unwrap();
    assert!(handle.upload_url.contains(&handle.handle_id.to_string()));

    // Phase 1 leaves a Pending intent behind.
    let intent = env
        .store
        .upload_intents
        .lock()
        .unwrap()
        .get(&handle.handle_id)
        .cloned()
        .unwrap();
    assert_eq!(intent.status, UploadIntentStatus::Pending);
    assert_eq!(intent.business_id, conversation_id.0);

    env.conversation_service
        .apply_upload_completed(&notice_for(&handle, conversation_id))
        .await
        .unwrap();

    let conversation = env
        .store
        .conversations
        .lock()
        .unwrap()
        .get(&conversation_id)
        .cloned()
        .unwrap();
    assert_eq!(
        conversation.avatar_url.as_deref(),
        Some(&*format!("{FILE_BASE_URL}/avatars/2026/08/cat.png"))
    );

    let intent = env
        .store
        .upload_intents
        .lock()
        .unwrap()
        .get(&handle.handle_id)
        .cloned()
        .unwrap();
    assert_eq!(intent.status, UploadIntentStatus::Completed);

    // Both members hear about the new avatar.
    let updates = env.events_of(EventType::ConversationAvatarUpdated);
    assert_eq!(updates.len(), 1);
    let receivers = TestEnv::receivers_of(&updates[0]);
    assert!(receivers.contains(&owner));
    assert!(receivers.contains(&member));
}

#[tokio::test]
async fn avatar_request_is_owner_only() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");
    let conversation_id = env.group_with_members(owner, "art", &[member]).await;

    let err = env
        .conversation_service
        .request_avatar_upload(conversation_id, member, "cat.png", "image/png", 4096)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Forbidden(_)));

    // Refused requests leave no intent behind.
    assert!(env.store.upload_intents.lock().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_notice_applies_once() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let conversation_id = env.group_with_members(owner, "art", &[]).await;

    let handle = env
        .conversation_service
        .request_avatar_upload(conversation_id, owner, "cat.png", "image/png", 4096)
        .await
        .unwrap();
    let notice = notice_for(&handle, conversation_id);
    env.conversation_service.apply_upload_completed(&notice).await.unwrap();
    env.conversation_service.apply_upload_completed(&notice).await.unwrap();

    // The redelivery changed nothing and fanned nothing out.
    assert_eq!(env.events_of(EventType::ConversationAvatarUpdated).len(), 1);
}

#[tokio::test]
async fn foreign_business_types_are_ignored() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let conversation_id = env.group_with_members(owner, "art", &[]).await;

    let handle = env
        .conversation_service
        .request_avatar_upload(conversation_id, owner, "cat.png", "image/png", 4096)
        .await
        .unwrap();
    let mut notice = notice_for(&handle, conversation_id);
    notice.business_type = "USER_AVATAR".into();

    env.conversation_service.apply_upload_completed(&notice).await.unwrap();

    let conversation = env
        .store
        .conversations
        .lock()
        .unwrap()
        .get(&conversation_id)
        .cloned()
        .unwrap();
    assert!(conversation.avatar_url.is_none());
    // The intent stays Pending; the real notice may still arrive.
    let intent = env
        .store
        .upload_intents
        .lock()
        .unwrap()
        .get(&handle.handle_id)
        .cloned()
        .unwrap();
    assert_eq!(intent.status, UploadIntentStatus::Pending);
}

#[tokio::test]
async fn notice_after_dissolve_is_discarded() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let conversation_id = env.group_with_members(owner, "art", &[]).await;

    let handle = env
        .conversation_service
        .request_avatar_upload(conversation_id, owner, "cat.png", "image/png", 4096)
        .await
        .unwrap();
    env.conversation_service.dissolve(conversation_id, owner).await.unwrap();

    env.conversation_service
        .apply_upload_completed(&notice_for(&handle, conversation_id))
        .await
        .unwrap();

    let intent = env
        .store
        .upload_intents
        .lock()
        .unwrap()
        .get(&handle.handle_id)
        .cloned()
        .unwrap();
    assert_eq!(intent.status, UploadIntentStatus::Discarded);
    let conversation = env
        .store
        .conversations
        .lock()
        .unwrap()
        .get(&conversation_id)
        .cloned()
        .unwrap();
    assert!(conversation.avatar_url.is_none());
    assert!(env.events_of(EventType::ConversationAvatarUpdated).is_empty());
}

#[tokio::test]
async fn notice_must_match_recorded_intent() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let target = env.group_with_members(owner, "art", &[]).await;
    let decoy = env.group_with_members(owner, "decoy", &[]).await;

    let handle = env
        .conversation_service
        .request_avatar_upload(target, owner, "cat.png", "image/png", 4096)
        .await
        .unwrap();

    // A notice steering the handle at a different conversation is dropped.
    env.conversation_service
        .apply_upload_completed(&notice_for(&handle, decoy))
        .await
        .unwrap();
    // So is one for a handle we never issued.
    let mut unissued = notice_for(&handle, target);
    unissued.handle_id = UploadHandleId(uuid::Uuid::new_v4());
    env.conversation_service
        .apply_upload_completed(&unissued)
        .await
        .unwrap();

    {
        let conversations = env.store.conversations.lock().unwrap();
        assert!(conversations.get(&target).unwrap().avatar_url.is_none());
        assert!(conversations.get(&decoy).unwrap().avatar_url.is_none());
    }
    let intent = env
        .store
        .upload_intents
        .lock()
        .unwrap()
        .get(&handle.handle_id)
        .cloned()
        .unwrap();
    assert_eq!(intent.status, UploadIntentStatus::Pending);
    assert!(env.events_of(EventType::ConversationAvatarUpdated).is_empty());
}
