use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPayload {
    pub key: String,
    pub payload: String,
    pub expires_at: i64,
}

/// Persistence seam shared by the progress store, the language preference and
/// the leaderboard cache.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<Option<String>>;
    async fn put_value(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_value(&self, key: &str) -> Result<()>;

    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
    async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64>;
}

/// Process-local storage. Used when the database cannot be opened, and by tests.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    cache: Mutex<HashMap<String, CachedPayload>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

fn poisoned<T>(_: T) -> anyhow::Error { anyhow!("memory storage lock poisoned") }

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().map_err(poisoned)?.get(key).cloned())
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().map_err(poisoned)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_value(&self, key: &str) -> Result<()> {
        self.values.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }

    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let cache = self.cache.lock().map_err(poisoned)?;
        Ok(cache.get(key).filter(|c| c.expires_at > now).map(|c| c.payload.clone()))
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        let entry = CachedPayload { key: key.to_string(), payload: payload.to_string(), expires_at };
        self.cache.lock().map_err(poisoned)?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        let mut cache = self.cache.lock().map_err(poisoned)?;
        let before = cache.len();
        match prefix {
            Some(p) => cache.retain(|k, _| !k.starts_with(p)),
            None => cache.clear(),
        }
        Ok((before - cache.len()) as u64)
    }
}

pub(crate) fn current_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
