use crate::domain_model::*;
use crate::domain_port::OutboxEvent;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Delivery bookkeeping the MySQL backend keeps in outbox columns.
#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub event: OutboxEvent,
    pub next_attempt_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub dead_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Process-local storage backend. Every adapter holds an `Arc` of this
/// and applies writes immediately; the tx seam is a no-op here, which is
/// fine for the paths the services drive (nothing is written before a
/// rollback).
#[derive(Default)]
pub struct MemStore {
    pub conversations: Mutex<HashMap<ConversationId, ConversationRecord>>,
    pub direct_pairs: Mutex<HashMap<(UserId, UserId), ConversationId>>,
    pub members: Mutex<HashMap<MemberId, MemberRecord>>,
    pub invites: Mutex<HashMap<InviteId, InviteRecord>>,
    pub blocks: Mutex<Vec<(UserId, UserId)>>,
    pub messages: Mutex<Vec<MessageRecord>>,
    pub upload_intents: Mutex<HashMap<UploadHandleId, UploadIntent>>,
    pub outbox: Mutex<Vec<OutboxRow>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Locks are never held across awaits, so a poisoned mutex only means a
/// panic elsewhere already aborted its critical section; the data is
/// still usable.
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Lexicographic keyset predicate shared by the mem feed queries:
/// strictly below the cursor in `(sort_ts DESC, id DESC)` order.
pub fn below_cursor(sort_ts: DateTime<Utc>, id: uuid::Uuid, cursor: &Cursor) -> bool {
    sort_ts < cursor.sort_ts || (sort_ts == cursor.sort_ts && id < cursor.tie_break)
}
