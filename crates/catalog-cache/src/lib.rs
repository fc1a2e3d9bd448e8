//! # catalog-cache
//!
//! TTL cache of search result sets over a pluggable backing store.
//!
//! The cache is an optimization only. [`ResultCache`] never reports an error
//! to its caller: an unreachable, slow or corrupt backend degrades to a miss
//! and the search runs live.
//!
//! ## Backends
//!
//! - [`InMemoryBackend`]: process-local map, the default
//! - `RedisBackend`: remote Redis server (feature `redis`)
//! - none: the cache is disabled and every lookup misses

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_backend;
pub mod result_cache;

pub use backend::CacheBackend;
pub use error::CacheError;
pub use memory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis_backend::RedisBackend;
pub use result_cache::{
    build_backend, cache_key, CacheMetrics, CacheMetricsSnapshot, ResultCache,
};
