//! The cache backing store capability.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// A key-value store with per-key expiry.
///
/// Implementations provide their own concurrency safety: `get`, `set` and
/// `delete` are atomic per key and may be called from many tasks at once.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Bytes stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key.
    async fn flush_all(&self) -> Result<(), CacheError>;
}
