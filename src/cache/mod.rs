//! Cache Gateway — spec §4.5, §6.4. Keyspace `hand:<tableId>` → opaque
//! bytes, no TTL; each key has exactly one writer (its owning table actor),
//! so last-writer-wins is safe (§5 "Shared resources").
//!
//! Conceptually grounded on the teacher's `HandState`/`DeckState` PDA
//! accounts (PDA address = key, account bytes = value) even though no
//! teacher code talks to an external cache — Solana accounts are the store.
//! The Redis client itself has no teacher counterpart; chosen per spec §6.5
//! naming `CACHE_HOST`/`CACHE_PORT`/`CACHE_DB`, the canonical shape of a
//! Redis connection target.

mod in_memory;
mod redis_backed;

pub use in_memory::InMemoryCache;
pub use redis_backed::RedisCache;

use async_trait::async_trait;

use crate::error::GameResult;

#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn load(&self, table_id: &str) -> GameResult<Option<Vec<u8>>>;
    async fn save(&self, table_id: &str, bytes: Vec<u8>) -> GameResult<()>;
    async fn delete(&self, table_id: &str) -> GameResult<()>;
    async fn exists(&self, table_id: &str) -> GameResult<bool>;
    /// Table ids (not raw `hand:<tableId>` keys) whose key starts with
    /// `hand:<prefix>`, used by cleanup/admin tooling to enumerate cached
    /// hands without needing a separate index.
    async fn list_by_prefix(&self, prefix: &str) -> GameResult<Vec<String>>;
}

pub fn key_for(table_id: &str) -> String {
    format!("hand:{table_id}")
}
