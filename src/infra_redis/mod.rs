mod seen_ledger_redis;

pub use seen_ledger_redis::RedisSeenLedger;
