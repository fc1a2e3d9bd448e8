//! Fail-open result cache.
//!
//! Wraps an optional [`CacheBackend`]. Every backend call is bounded by a
//! timeout; errors, timeouts and undecodable payloads are counted, logged and
//! degraded to a miss (reads) or an ignored write. Callers never see a cache
//! error.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use catalog_types::{CacheBackendKind, CacheSettings, Record};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::backend::CacheBackend;
use crate::error::CacheError;
use crate::memory::InMemoryBackend;

const KEY_PREFIX: &str = "search";

/// Cache key for a pair of search filters against one store generation.
///
/// The name filter is length-prefixed, so no two distinct pairs share a key
/// whatever characters the filters contain. Keys from an older generation
/// are never looked up again after a reload.
pub fn cache_key(generation: u64, name: &str, instructor: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        KEY_PREFIX,
        generation,
        name.len(),
        name,
        instructor
    )
}

/// Counters for cache outcomes.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub errors: AtomicU64,
    pub timeouts: AtomicU64,
    pub decode_failures: AtomicU64,
    pub writes: AtomicU64,
    pub write_failures: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all counts as a snapshot.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub decode_failures: u64,
    pub writes: u64,
    pub write_failures: u64,
}

impl CacheMetricsSnapshot {
    /// Total lookups (hits + misses).
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Backend calls that degraded to the fail-open path.
    pub fn degraded(&self) -> u64 {
        self.errors + self.timeouts + self.decode_failures
    }
}

/// Build the backend named by `settings`.
///
/// Returns `None` for a disabled cache. A backend that cannot be reached at
/// startup is logged and treated as disabled.
pub async fn build_backend(settings: &CacheSettings) -> Option<Arc<dyn CacheBackend>> {
    match settings.backend {
        CacheBackendKind::Disabled => {
            info!("Result cache disabled");
            None
        }
        CacheBackendKind::Memory => Some(Arc::new(InMemoryBackend::new())),
        CacheBackendKind::Redis => connect_redis(settings).await,
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(settings: &CacheSettings) -> Option<Arc<dyn CacheBackend>> {
    let connect = crate::redis_backend::RedisBackend::connect(&settings.url);
    match timeout(settings.timeout(), connect).await {
        Ok(Ok(backend)) => Some(Arc::new(backend)),
        Ok(Err(e)) => {
            warn!(error = %e, url = %settings.url, "Redis cache unavailable, running without cache");
            None
        }
        Err(_) => {
            warn!(url = %settings.url, timeout_ms = settings.timeout_ms, "Redis connect timed out, running without cache");
            None
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(settings: &CacheSettings) -> Option<Arc<dyn CacheBackend>> {
    warn!(
        url = %settings.url,
        "Redis cache requested but this build lacks the `redis` feature, running without cache"
    );
    None
}

/// TTL cache of search result sets.
pub struct ResultCache {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
    timeout: Duration,
    metrics: Arc<CacheMetrics>,
}

impl ResultCache {
    /// Create a cache over `backend`. `None` means every lookup misses.
    pub fn new(backend: Option<Arc<dyn CacheBackend>>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            backend,
            ttl,
            timeout,
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    /// A cache with no backing store.
    pub fn disabled() -> Self {
        let defaults = CacheSettings::default();
        Self::new(None, defaults.ttl(), defaults.timeout())
    }

    /// Build the configured backend and wrap it.
    pub async fn from_settings(settings: &CacheSettings) -> Self {
        let backend = build_backend(settings).await;
        Self::new(backend, settings.ttl(), settings.timeout())
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map_or("none", |b| b.name())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Cached results under `key`, or `None` on a miss.
    ///
    /// Backend failures, timeouts and corrupt payloads are all misses.
    pub async fn get(&self, key: &str) -> Option<Vec<Record>> {
        let Some(backend) = &self.backend else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let bytes = self.guarded("get", key, backend.get(key)).await.flatten();
        let Some(bytes) = bytes else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache miss");
            return None;
        };

        match serde_json::from_slice::<Vec<Record>>(&bytes) {
            Ok(records) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, results = records.len(), "Cache hit");
                Some(records)
            }
            Err(e) => {
                self.metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store `results` under `key` for the configured TTL. Best-effort.
    pub async fn put(&self, key: &str, results: &[Record]) {
        let Some(backend) = &self.backend else {
            return;
        };

        let bytes = match serde_json::to_vec(results) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %CacheError::from(e), "Could not encode results for cache");
                return;
            }
        };

        match self.guarded("set", key, backend.set(key, bytes, self.ttl)).await {
            Some(()) => {
                self.metrics.writes.fetch_add(1, Ordering::Relaxed);
                debug!(key, results = results.len(), ttl_secs = self.ttl.as_secs(), "Cached results");
            }
            None => {
                self.metrics.write_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Remove one entry. Best-effort.
    pub async fn delete(&self, key: &str) {
        if let Some(backend) = &self.backend {
            self.guarded("delete", key, backend.delete(key)).await;
        }
    }

    /// Remove every entry. Returns false if the backend could not be flushed.
    pub async fn flush_all(&self) -> bool {
        let Some(backend) = &self.backend else {
            return true;
        };
        let flushed = self.guarded("flush_all", "*", backend.flush_all()).await.is_some();
        if flushed {
            info!(backend = backend.name(), "Flushed result cache");
        }
        flushed
    }

    /// Run one backend call under the timeout. `None` on error or timeout.
    async fn guarded<T, F>(&self, op: &'static str, key: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match timeout(self.timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                warn!(op, key, error = %e, "Cache backend call failed, continuing without cache");
                None
            }
            Err(_) => {
                self.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    op,
                    key,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Cache backend call timed out, continuing without cache"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("backend", &self.backend_name())
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}
