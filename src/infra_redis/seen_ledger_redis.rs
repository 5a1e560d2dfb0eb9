use crate::domain_port::SeenLedger;
use redis::aio::ConnectionManager;

pub struct RedisSeenLedger {
    conn: ConnectionManager,
    prefix: String,
    ttl_secs: u64,
}

impl RedisSeenLedger {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        RedisSeenLedger {
            conn,
            prefix: prefix.into(),
            ttl_secs,
        }
    }

    fn key(&self, event_id: &str) -> String {
        format!("{}:{}", self.prefix, event_id)
    }
}

#[async_trait::async_trait]
impl SeenLedger for RedisSeenLedger {
    async fn first_sighting(&self, event_id: &str) -> anyhow::Result<bool> {
        let key = self.key(event_id);
        let mut conn = self.conn.clone();

        // SET NX EX: exactly one consumer observes true per event id until
        // the ledger entry expires. Redelivery after expiry is tolerated;
        // handlers stay idempotent anyway.
        let set: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;

        Ok(set.is_some())
    }
}
