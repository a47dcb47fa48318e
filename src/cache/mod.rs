pub mod file;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::config::{CacheBackend, CacheConfig};

/// Key/value store for serialized responses with per-entry expiry.
///
/// Expired and missing entries are both reported as a miss.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: &Value) -> Result<()>;
    /// Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
    /// Remove every entry whose key matches the regex `pattern`; returns how many went.
    async fn delete_matching(&self, pattern: &str) -> Result<usize>;
}

/// Build the configured cache, or `None` when caching is disabled.
pub fn create_cache(config: &CacheConfig) -> Option<Arc<dyn ResponseCache>> {
    if !config.enabled {
        return None;
    }
    let expiry = Duration::seconds(config.expiry_secs.min(u64::from(u32::MAX)) as i64);
    let cache: Arc<dyn ResponseCache> = match config.backend {
        CacheBackend::File => Arc::new(file::FileCache::new(config.cache_dir(), expiry)),
        CacheBackend::Memory => Arc::new(memory::MemoryCache::new(expiry)),
    };
    Some(cache)
}

pub(crate) fn is_fresh(written_at: DateTime<Utc>, expiry: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(written_at) < expiry
}

/// Normalized request signature: method, resource, id and pagination.
pub fn cache_key(method: &str, resource: &str, id: Option<&str>, page: u32, limit: u32) -> String {
    let id = id
        .map(|id| urlencoding::encode(id).into_owned())
        .unwrap_or_else(|| "all".into());
    format!(
        "{}_{resource}_{id}_page_{page}_limit_{limit}",
        method.to_ascii_uppercase()
    )
}

/// Pattern matching every cached GET of `resource`.
pub fn resource_pattern(resource: &str) -> String {
    format!("^GET_{}_", regex::escape(resource))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_signature_parts() {
        assert_eq!(
            cache_key("get", "tickets", None, 2, 50),
            "GET_tickets_all_page_2_limit_50"
        );
        assert_eq!(
            cache_key("GET", "bugs", Some("a b/7"), 1, 50),
            "GET_bugs_a%20b%2F7_page_1_limit_50"
        );
    }

    #[test]
    fn resource_pattern_matches_only_that_resource() {
        let re = regex::Regex::new(&resource_pattern("tickets")).unwrap();
        assert!(re.is_match(&cache_key("GET", "tickets", Some("5"), 1, 50)));
        assert!(!re.is_match(&cache_key("GET", "bugs", Some("5"), 1, 50)));
    }

    #[test]
    fn freshness_window_is_exclusive() {
        let now = Utc::now();
        let expiry = Duration::seconds(300);
        assert!(is_fresh(now - Duration::seconds(299), expiry, now));
        assert!(!is_fresh(now - Duration::seconds(300), expiry, now));
        assert!(!is_fresh(now, Duration::zero(), now));
    }

    #[test]
    fn disabled_cache_is_none() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(create_cache(&config).is_none());
    }
}
