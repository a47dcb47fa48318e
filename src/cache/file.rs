use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{is_fresh, ResponseCache};

const FILE_PREFIX: &str = "ticketing-gateway-";
const FILE_SUFFIX: &str = ".cache";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    written_at: DateTime<Utc>,
    value: Value,
}

/// One JSON file per key in a shared directory. Concurrent writers to the
/// same key race; the last write wins.
pub struct FileCache {
    dir: PathBuf,
    expiry: Duration,
}

impl FileCache {
    pub fn new(dir: PathBuf, expiry: Duration) -> Self {
        Self { dir, expiry }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{FILE_PREFIX}{digest}{FILE_SUFFIX}"))
    }

    async fn read_entry(path: &PathBuf) -> Result<Option<CacheEntry>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn remove(path: &PathBuf) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[async_trait]
impl ResponseCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let Some(entry) = Self::read_entry(&path).await? else {
            return Ok(None);
        };
        if entry.key != key || !is_fresh(entry.written_at, self.expiry, Utc::now()) {
            debug!(key, "cache entry stale");
            Self::remove(&path).await?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let entry = CacheEntry {
            key: key.to_string(),
            written_at: Utc::now(),
            value: value.clone(),
        };
        let path = self.path_for(key);
        let json = serde_json::to_vec(&entry)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Self::remove(&self.path_for(key)).await
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let re = Regex::new(pattern)?;
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", self.dir.display()))
            }
        };

        let mut count = 0;
        while let Some(dirent) = dir.next_entry().await? {
            let name = dirent.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(FILE_PREFIX) || !name.ends_with(FILE_SUFFIX) {
                continue;
            }
            let path = dirent.path();
            let Some(entry) = Self::read_entry(&path).await? else {
                continue;
            };
            if re.is_match(&entry.key) {
                Self::remove(&path).await?;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(dir: &tempfile::TempDir, expiry_secs: i64) -> FileCache {
        FileCache::new(dir.path().to_path_buf(), Duration::seconds(expiry_secs))
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir, 300);
        let payload = json!({ "message": "Fetched all employees", "employees": [] });

        cache.set("GET_employees_all_page_1_limit_50", &payload).await.unwrap();
        assert_eq!(
            cache.get("GET_employees_all_page_1_limit_50").await.unwrap(),
            Some(payload)
        );
        assert_eq!(cache.get("GET_employees_7_page_1_limit_50").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir, 0);
        cache.set("k", &json!(1)).await.unwrap();
        let path = cache.path_for("k");
        assert!(path.exists());

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir, 300);
        cache.set("k", &json!(1)).await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_matching_uses_stored_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir, 300);
        cache.set("GET_tickets_all_page_1_limit_50", &json!(1)).await.unwrap();
        cache.set("GET_tickets_9_page_1_limit_50", &json!(2)).await.unwrap();
        cache.set("GET_bugs_all_page_1_limit_50", &json!(3)).await.unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        assert_eq!(cache.delete_matching("^GET_tickets_").await.unwrap(), 2);
        assert_eq!(
            cache.get("GET_bugs_all_page_1_limit_50").await.unwrap(),
            Some(json!(3))
        );
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[tokio::test]
    async fn delete_matching_on_missing_dir_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nope"), Duration::seconds(1));
        assert_eq!(cache.delete_matching(".*").await.unwrap(), 0);
    }
}
