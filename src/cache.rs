//! CacheAside - Read-Through Cache
//!
//! ## Responsibilities
//!
//! - Accelerate read-heavy paths (camera directory, detection listings,
//!   active-stream set) with per-key TTLs
//! - Explicit invalidation by key and by prefix
//! - Degrade to direct source reads when the backend is unavailable
//!
//! Cache failures are never surfaced to callers: a broken or unavailable
//! cache behaves like a permanent miss, and invalidation is best-effort.
//! Values are stored as JSON with typed encode/decode at the edges; a
//! decode failure counts as a miss.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache key constants and builders
pub mod keys {
    /// Full camera directory
    pub const CAMERAS_ALL: &str = "cameras:all";
    /// Active-stream set
    pub const ACTIVE_STREAMS: &str = "streams:active";
    /// Total detection count
    pub const DETECTION_COUNT: &str = "detections:count";
    /// Prefix shared by all paginated detection listings
    pub const DETECTION_RESULTS_PREFIX: &str = "detections:results:page:";

    /// Per-camera detail entry
    pub fn camera_detail(camera_id: &str) -> String {
        format!("camera:detail:{camera_id}")
    }

    /// One page of the detection listing
    pub fn detection_results(page: u32) -> String {
        format!("{DETECTION_RESULTS_PREFIX}{page}")
    }
}

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Cache-aside store over an in-process table
pub struct CacheAside {
    entries: RwLock<HashMap<String, CacheEntry>>,
    available: AtomicBool,
}

impl CacheAside {
    /// Create an available cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Create a cache whose backend is down; every read misses, every
    /// write is dropped (callers fall back to the source of truth)
    pub fn unavailable() -> Self {
        let cache = Self::new();
        cache.available.store(false, Ordering::Release);
        cache
    }

    /// Flip backend availability (degradation tests, reconnect handling)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
        tracing::info!(available = available, "Cache availability changed");
    }

    /// Whether the backend is currently reachable
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Get a value; `None` on miss, expiry, unavailability or decode failure
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_available() {
            return None;
        }

        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }

        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to decode cached value");
                None
            }
        }
    }

    /// Store a value with a TTL; best-effort
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        if !self.is_available() {
            return false;
        }

        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to encode value for cache");
                return false;
            }
        };

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: json,
                expires_at: Instant::now() + ttl,
            },
        );
        true
    }

    /// Read-through: return the cached value, or call `loader` against the
    /// source of truth, cache the result (best-effort) and return it.
    ///
    /// Loader errors propagate; cache store failures do not.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::trace!(key = %key, "Cache hit");
            return Ok(value);
        }

        let value = loader().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Remove one key; best-effort
    pub async fn invalidate(&self, key: &str) {
        if !self.is_available() {
            tracing::debug!(key = %key, "Cache unavailable, skipping invalidation");
            return;
        }

        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            tracing::trace!(key = %key, "Cache key invalidated");
        }
    }

    /// Remove every key starting with `prefix`; best-effort
    pub async fn invalidate_prefix(&self, prefix: &str) {
        if !self.is_available() {
            tracing::debug!(prefix = %prefix, "Cache unavailable, skipping invalidation");
            return;
        }

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(prefix = %prefix, removed = removed, "Cache prefix invalidated");
        }
    }

    /// Drop entries whose TTL has elapsed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Current entry count (dead entries included until purged)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for CacheAside {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = CacheAside::new();
        cache.set("k", &vec![1u32, 2, 3], TTL).await;
        let got: Option<Vec<u32>> = cache.get("k").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = CacheAside::new();
        cache.set("k", &"v".to_string(), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let got: Option<String> = cache.get("k").await;
        assert!(got.is_none());
        assert_eq!(cache.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn test_unavailable_cache_misses_and_drops_writes() {
        let cache = CacheAside::unavailable();
        assert!(!cache.set("k", &1u32, TTL).await);
        let got: Option<u32> = cache.get("k").await;
        assert!(got.is_none());

        // get_or_load falls through to the loader every time
        let value = cache
            .get_or_load("k", TTL, || async { Ok(42u32) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_read_after_invalidate_reflects_new_write() {
        let cache = CacheAside::new();

        // Warm the cache with stale data
        cache.set("count", &1u64, TTL).await;

        // Source write then invalidate
        cache.invalidate("count").await;

        // Next read-through sees the new value, not the stale entry
        let value = cache
            .get_or_load("count", TTL, || async { Ok(2u64) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_spares_other_keys() {
        let cache = CacheAside::new();
        cache.set(&keys::detection_results(1), &"p1".to_string(), TTL).await;
        cache.set(&keys::detection_results(2), &"p2".to_string(), TTL).await;
        cache.set(keys::CAMERAS_ALL, &"cams".to_string(), TTL).await;

        cache.invalidate_prefix(keys::DETECTION_RESULTS_PREFIX).await;

        let p1: Option<String> = cache.get(&keys::detection_results(1)).await;
        let cams: Option<String> = cache.get(keys::CAMERAS_ALL).await;
        assert!(p1.is_none());
        assert_eq!(cams.as_deref(), Some("cams"));
    }

    #[tokio::test]
    async fn test_loader_error_propagates() {
        let cache = CacheAside::new();
        let result = cache
            .get_or_load::<u32, _, _>("k", TTL, || async {
                Err(crate::Error::Persistence("db down".to_string()))
            })
            .await;
        assert!(result.is_err());
    }
}
