use crate::metrics_defs::{CACHE_ERRORS, CACHE_GET_HIT, CACHE_GET_MISS};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid cache URL: {0}")]
    InvalidUrl(String),

    #[error("cache service returned {status} for key {key}")]
    Status { key: String, status: StatusCode },
}

/// Storage seam for the flag store. Every call is one awaited round-trip to
/// the cache service; failures are surfaced as-is and never retried.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Returns every key/value pair whose key starts with `prefix`.
    async fn scan(&self, prefix: &str) -> Result<HashMap<String, String>, CacheError>;
}

#[derive(Deserialize)]
struct ScanResponse {
    entries: HashMap<String, String>,
}

/// Client for the cache service's KV HTTP API.
pub struct HttpCache {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCache {
    pub fn new<U>(base_url: U) -> Self
    where
        U: Into<String>,
    {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        HttpCache {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn key_url(&self, key: &str) -> Result<Url, CacheError> {
        let mut url = Url::parse(&format!("{}/v1/kv", self.base_url))
            .map_err(|e| CacheError::InvalidUrl(e.to_string()))?;
        // The key goes out as one percent-encoded path segment: flag names
        // carry no character constraints, so a `/` or `?` in a name must not
        // split or truncate the path.
        url.path_segments_mut()
            .map_err(|()| CacheError::InvalidUrl(self.base_url.clone()))?
            .push(key);
        Ok(url)
    }

    fn scan_url(&self, prefix: &str) -> Result<Url, CacheError> {
        let mut url = Url::parse(&format!("{}/v1/kv", self.base_url))
            .map_err(|e| CacheError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("prefix", prefix);
        Ok(url)
    }
}

#[async_trait]
impl CacheBackend for HttpCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let response = self.client.get(self.key_url(key)?).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                metrics::counter!(CACHE_GET_MISS.name).increment(1);
                Ok(None)
            }
            status if status.is_success() => {
                metrics::counter!(CACHE_GET_HIT.name).increment(1);
                Ok(Some(response.text().await?))
            }
            status => {
                metrics::counter!(CACHE_ERRORS.name).increment(1);
                Err(CacheError::Status {
                    key: key.to_string(),
                    status,
                })
            }
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let response = self
            .client
            .put(self.key_url(key)?)
            .body(value.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            metrics::counter!(CACHE_ERRORS.name).increment(1);
            return Err(CacheError::Status {
                key: key.to_string(),
                status,
            });
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let response = self.client.delete(self.key_url(key)?).send().await?;

        let status = response.status();
        // Deleting a key that was never set is a no-op, not an error.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            metrics::counter!(CACHE_ERRORS.name).increment(1);
            return Err(CacheError::Status {
                key: key.to_string(),
                status,
            });
        }
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<HashMap<String, String>, CacheError> {
        let response = self.client.get(self.scan_url(prefix)?).send().await?;

        let status = response.status();
        if !status.is_success() {
            metrics::counter!(CACHE_ERRORS.name).increment(1);
            return Err(CacheError::Status {
                key: prefix.to_string(),
                status,
            });
        }

        let parsed = response.json::<ScanResponse>().await?;
        Ok(parsed.entries)
    }
}

/// In-process backend for tests and offline tooling.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<HashMap<String, String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::spawn_kv_server;

    #[tokio::test]
    async fn test_http_cache_get_put_delete() {
        let (base_url, _entries) = spawn_kv_server().await;
        let cache = HttpCache::new(&base_url);

        assert_eq!(cache.get("feature_flag:missing").await.unwrap(), None);

        cache.put("feature_flag:a", "value-a").await.unwrap();
        assert_eq!(
            cache.get("feature_flag:a").await.unwrap(),
            Some("value-a".to_string())
        );

        cache.delete("feature_flag:a").await.unwrap();
        assert_eq!(cache.get("feature_flag:a").await.unwrap(), None);

        // Deleting an absent key is fine.
        cache.delete("feature_flag:a").await.unwrap();
    }

    #[tokio::test]
    async fn test_http_cache_scan_filters_by_prefix() {
        let (base_url, _entries) = spawn_kv_server().await;
        let cache = HttpCache::new(&base_url);

        cache.put("feature_flag:a", "1").await.unwrap();
        cache.put("feature_flag:b", "2").await.unwrap();
        cache.put("session:c", "3").await.unwrap();

        let entries = cache.scan("feature_flag:").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("feature_flag:a"), Some(&"1".to_string()));
        assert_eq!(entries.get("feature_flag:b"), Some(&"2".to_string()));
    }

    #[tokio::test]
    async fn test_http_cache_key_is_one_path_segment() {
        let (base_url, _entries) = spawn_kv_server().await;
        let cache = HttpCache::new(&base_url);

        // Flag names carry no character constraints beyond non-empty.
        for key in ["feature_flag:team/rollout", "feature_flag:a b?c#d"] {
            cache.put(key, "v").await.unwrap();
            assert_eq!(cache.get(key).await.unwrap(), Some("v".to_string()));
            cache.delete(key).await.unwrap();
            assert_eq!(cache.get(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_http_cache_failed_put_surfaces_status() {
        let base_url = crate::testutils::spawn_failing_kv_server().await;
        let cache = HttpCache::new(&base_url);

        let err = cache.put("feature_flag:a", "v").await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));

        let err = cache.get("feature_flag:a").await.unwrap_err();
        assert!(matches!(err, CacheError::Status { .. }));
    }

    #[tokio::test]
    async fn test_http_cache_unreachable_is_transport_error() {
        // Nothing listens on this port.
        let cache = HttpCache::new("http://127.0.0.1:1");
        let err = cache.get("feature_flag:a").await.unwrap_err();
        assert!(matches!(err, CacheError::Transport(_)));
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryCache::new();
        cache.put("feature_flag:a", "1").await.unwrap();
        cache.put("other:b", "2").await.unwrap();

        assert_eq!(
            cache.get("feature_flag:a").await.unwrap(),
            Some("1".to_string())
        );
        assert_eq!(cache.scan("feature_flag:").await.unwrap().len(), 1);

        cache.delete("feature_flag:a").await.unwrap();
        assert_eq!(cache.get("feature_flag:a").await.unwrap(), None);
    }
}
