use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::Value;

use super::{is_fresh, ResponseCache};

/// In-process cache, used when no shared storage is wanted and in tests.
pub struct MemoryCache {
    expiry: Duration,
    entries: Mutex<HashMap<String, (DateTime<Utc>, Value)>>,
}

impl MemoryCache {
    pub fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (DateTime<Utc>, Value)>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory cache lock poisoned"))
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.lock()?;
        let fresh = match entries.get(key) {
            Some((written_at, value)) if is_fresh(*written_at, self.expiry, Utc::now()) => {
                Some(value.clone())
            }
            _ => None,
        };
        if fresh.is_none() {
            entries.remove(key);
        }
        Ok(fresh)
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.lock()?
            .insert(key.to_string(), (Utc::now(), value.clone()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let re = Regex::new(pattern)?;
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|key, _| !re.is_match(key));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get() {
        let cache = MemoryCache::new(Duration::seconds(300));
        cache.set("GET_tickets_all", &json!({"n": 1})).await.unwrap();
        assert_eq!(cache.get("GET_tickets_all").await.unwrap(), Some(json!({"n": 1})));
        assert_eq!(cache.get("GET_bugs_all").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_expiry_always_misses() {
        let cache = MemoryCache::new(Duration::zero());
        cache.set("k", &json!(1)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_matching_counts_removed() {
        let cache = MemoryCache::new(Duration::seconds(300));
        cache.set("GET_tickets_all", &json!(1)).await.unwrap();
        cache.set("GET_tickets_5", &json!(2)).await.unwrap();
        cache.set("GET_bugs_all", &json!(3)).await.unwrap();
        assert_eq!(cache.delete_matching("^GET_tickets_").await.unwrap(), 2);
        assert_eq!(cache.get("GET_bugs_all").await.unwrap(), Some(json!(3)));
        cache.delete("GET_bugs_all").await.unwrap();
        cache.delete("GET_bugs_all").await.unwrap();
        assert_eq!(cache.get("GET_bugs_all").await.unwrap(), None);
    }
}
