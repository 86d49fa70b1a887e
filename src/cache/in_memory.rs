//! In-memory `CacheGateway`, used for `MODE=test` and unit tests so nothing
//! needs a live Redis instance (spec §6.5 `MODE`).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GameResult;
use super::{key_for, CacheGateway};

#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache::default()
    }
}

#[async_trait]
impl CacheGateway for InMemoryCache {
    async fn load(&self, table_id: &str) -> GameResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        Ok(entries.get(&key_for(table_id)).cloned())
    }

    async fn save(&self, table_id: &str, bytes: Vec<u8>) -> GameResult<()> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(key_for(table_id), bytes);
        Ok(())
    }

    async fn delete(&self, table_id: &str) -> GameResult<()> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.remove(&key_for(table_id));
        Ok(())
    }

    async fn exists(&self, table_id: &str) -> GameResult<bool> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        Ok(entries.contains_key(&key_for(table_id)))
    }

    async fn list_by_prefix(&self, prefix: &str) -> GameResult<Vec<String>> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        let full_prefix = key_for(prefix);
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(&full_prefix))
            .map(|key| key.trim_start_matches("hand:").to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_by_table_id() {
        let cache = InMemoryCache::new();
        assert!(cache.load("t1").await.unwrap().is_none());
        cache.save("t1", vec![1, 2, 3]).await.unwrap();
        assert_eq!(cache.load("t1").await.unwrap(), Some(vec![1, 2, 3]));
        cache.delete("t1").await.unwrap();
        assert!(cache.load("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exists_and_list_by_prefix_reflect_stored_keys() {
        let cache = InMemoryCache::new();
        assert!(!cache.exists("lobby-1").await.unwrap());
        cache.save("lobby-1", vec![9]).await.unwrap();
        cache.save("lobby-2", vec![9]).await.unwrap();
        cache.save("other", vec![9]).await.unwrap();
        assert!(cache.exists("lobby-1").await.unwrap());

        let mut matches = cache.list_by_prefix("lobby-").await.unwrap();
        matches.sort();
        assert_eq!(matches, vec!["lobby-1".to_string(), "lobby-2".to_string()]);
    }
}
