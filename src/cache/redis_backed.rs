//! Redis-backed `CacheGateway` — spec §6.4. Keys never expire (`GET`/`SET`,
//! no `EX`), matching "No TTL" in the persisted-state-layout contract.

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::error::{GameError, GameResult};
use super::{key_for, CacheGateway};

pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn connect(host: &str, port: u16, db: i64) -> GameResult<Self> {
        let url = format!("redis://{host}:{port}/{db}");
        let client = redis::Client::open(url).map_err(|err| GameError::External(format!("redis client init failed: {err}")))?;
        Ok(RedisCache { client })
    }

    async fn connection(&self) -> GameResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| GameError::External(format!("redis connection failed: {err}")))
    }
}

#[async_trait]
impl CacheGateway for RedisCache {
    async fn load(&self, table_id: &str) -> GameResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        conn.get(key_for(table_id)).await.map_err(|err| GameError::External(format!("redis GET failed: {err}")))
    }

    async fn save(&self, table_id: &str, bytes: Vec<u8>) -> GameResult<()> {
        let mut conn = self.connection().await?;
        conn.set(key_for(table_id), bytes).await.map_err(|err| GameError::External(format!("redis SET failed: {err}")))
    }

    async fn delete(&self, table_id: &str) -> GameResult<()> {
        let mut conn = self.connection().await?;
        let _: i64 = conn.del(key_for(table_id)).await.map_err(|err| GameError::External(format!("redis DEL failed: {err}")))?;
        Ok(())
    }

    async fn exists(&self, table_id: &str) -> GameResult<bool> {
        let mut conn = self.connection().await?;
        conn.exists(key_for(table_id)).await.map_err(|err| GameError::External(format!("redis EXISTS failed: {err}")))
    }

    async fn list_by_prefix(&self, prefix: &str) -> GameResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", key_for(prefix));
        let keys: Vec<String> = conn.keys(pattern).await.map_err(|err| GameError::External(format!("redis KEYS failed: {err}")))?;
        Ok(keys.into_iter().map(|key| key.trim_start_matches("hand:").to_string()).collect())
    }
}
