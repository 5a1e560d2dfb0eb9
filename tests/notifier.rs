mod common;

use chrono::{Duration, Utc};
use colloquy::application_port::*;
use colloquy::domain_model::*;
use colloquy::domain_port::EventType;
use colloquy::infra_mem::MemSeenLedger;
use colloquy::server::{EventHandler, EventPublisher, HandleOutcome, Notifier, UploadNoticeHandler};
use common::TestEnv;
use serde_json::json;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, Vec<u8>, Vec<u8>)>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    fn published(&self) -> Vec<(String, Vec<u8>, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("broker unavailable");
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_vec(), payload.to_vec()));
        Ok(())
    }
}

fn notifier_for(env: &TestEnv, publisher: Arc<RecordingPublisher>) -> Notifier {
    Notifier::new(
        env.tx_manager.clone(),
        env.outbox_repo.clone(),
        publisher,
        "test",
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn delivers_and_marks_delivered() {
    let env = TestEnv::new();
    let a = env.user("ada");
    let b = env.user("grace");
    let conversation_id = env.conversation_service.create_direct(a, b).await.unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let notifier = notifier_for(&env, publisher.clone());

    assert!(notifier.tick_once().await.unwrap());

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    let (topic, key, payload) = &published[0];
    assert_eq!(topic, "test.conversation.created");
    assert_eq!(key.as_slice(), conversation_id.0.as_bytes());

    // Envelope: stable event id, receivers, and the domain payload.
    let event = env.events_of(EventType::ConversationCreated).remove(0);
    let envelope: serde_json::Value = serde_json::from_slice(payload).unwrap();
    assert_eq!(envelope["eventId"], json!(event.event_id.0.to_string()));
    assert_eq!(envelope["receivers"], event.receivers_json);
    assert_eq!(envelope["body"], event.payload_json);

    // Delivered events are not claimed again.
    assert!(!notifier.tick_once().await.unwrap());
    assert_eq!(publisher.published().len(), 1);
    let row = env.store.outbox.lock().unwrap()[0].clone();
    assert!(row.delivered_at.is_some());
}

#[tokio::test]
async fn failure_backs_off_then_recovers() {
    let env = TestEnv::new();
    let a = env.user("ada");
    let b = env.user("grace");
    env.conversation_service.create_direct(a, b).await.unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    publisher.set_failing(true);
    let notifier = notifier_for(&env, publisher.clone());

    assert!(notifier.tick_once().await.unwrap());
    {
        let outbox = env.store.outbox.lock().unwrap();
        assert_eq!(outbox[0].event.attempt_count, 1);
        assert!(outbox[0].next_attempt_at > Utc::now());
        assert!(outbox[0].dead_at.is_none());
        assert_eq!(outbox[0].last_error.as_deref(), Some("broker unavailable"));
    }

    // Not due yet: the rescheduled event is invisible to the next tick.
    publisher.set_failing(false);
    assert!(!notifier.tick_once().await.unwrap());
    assert!(publisher.published().is_empty());

    // Once due again it goes out normally.
    env.store.outbox.lock().unwrap()[0].next_attempt_at = Utc::now() - Duration::seconds(1);
    assert!(notifier.tick_once().await.unwrap());
    assert_eq!(publisher.published().len(), 1);
    assert!(env.store.outbox.lock().unwrap()[0].delivered_at.is_some());
}

#[tokio::test]
async fn exhausted_events_park_in_dead_letter() {
    let env = TestEnv::new();
    let a = env.user("ada");
    let b = env.user("grace");
    env.conversation_service.create_direct(a, b).await.unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    publisher.set_failing(true);
    let notifier = notifier_for(&env, publisher.clone());

    // Final permitted attempt.
    env.store.outbox.lock().unwrap()[0].event.attempt_count = 7;
    assert!(notifier.tick_once().await.unwrap());
    {
        let outbox = env.store.outbox.lock().unwrap();
        assert!(outbox[0].dead_at.is_some());
        assert!(outbox[0].delivered_at.is_none());
    }

    // Dead events stay parked even when the broker comes back.
    publisher.set_failing(false);
    assert!(!notifier.tick_once().await.unwrap());
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn each_kind_gets_its_own_topic() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let member = env.user("grace");
    let conversation_id = env.group_with_members(owner, "fanout", &[member]).await;
    env.message_service
        .send_message(conversation_id, owner, "hello")
        .await
        .unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let notifier = notifier_for(&env, publisher.clone());
    assert!(notifier.tick_once().await.unwrap());

    let topics: Vec<String> = publisher.published().iter().map(|p| p.0.clone()).collect();
    assert!(topics.contains(&"test.conversation.created".to_string()));
    assert!(topics.contains(&"test.invite.created".to_string()));
    assert!(topics.contains(&"test.conversation.joined".to_string()));
    assert!(topics.contains(&"test.message.created".to_string()));
}

fn upload_envelope(event_id: &str, handle: &UploadHandle, conversation_id: ConversationId) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "eventId": event_id,
        "body": {
            "handleId": handle.handle_id.0,
            "businessType": "CONVERSATION_AVATAR",
            "businessId": conversation_id.to_string(),
            "bucket": "avatars",
            "objectKey": "k.png",
            "contentType": "image/png",
        },
    }))
    .unwrap()
}

#[tokio::test]
async fn upload_handler_applies_once_per_event_id() {
    let env = TestEnv::new();
    let owner = env.user("ada");
    let conversation_id = env.group_with_members(owner, "art", &[]).await;
    let handle = env
        .conversation_service
        .request_avatar_upload(conversation_id, owner, "k.png", "image/png", 1024)
        .await
        .unwrap();

    let handler = UploadNoticeHandler::new(
        Arc::new(MemSeenLedger::new()),
        env.conversation_service.clone(),
    );

    let payload = upload_envelope("evt-1", &handle, conversation_id);
    assert!(matches!(
        handler.handle(&payload).await.unwrap(),
        HandleOutcome::Commit
    ));
    let avatar = env
        .store
        .conversations
        .lock()
        .unwrap()
        .get(&conversation_id)
        .and_then(|c| c.avatar_url.clone());
    assert!(avatar.is_some());

    // Redelivery of the same broker event commits without re-running.
    assert!(matches!(
        handler.handle(&payload).await.unwrap(),
        HandleOutcome::Commit
    ));
    assert_eq!(env.events_of(EventType::ConversationAvatarUpdated).len(), 1);
}

#[tokio::test]
async fn upload_handler_drops_poison_messages() {
    let env = TestEnv::new();
    let handler = UploadNoticeHandler::new(
        Arc::new(MemSeenLedger::new()),
        env.conversation_service.clone(),
    );

    assert!(matches!(
        handler.handle(b"not json at all").await.unwrap(),
        HandleOutcome::Commit
    ));
    assert!(matches!(
        handler
            .handle(br#"{"eventId":"x","body":{"wrong":"shape"}}"#)
            .await
            .unwrap(),
        HandleOutcome::Commit
    ));
}
