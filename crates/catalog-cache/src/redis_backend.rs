//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionLike, MultiplexedConnection};
use redis::AsyncCommands;
use tracing::info;

use crate::backend::CacheBackend;
use crate::error::CacheError;

/// Cache backed by a Redis server over one multiplexed connection.
///
/// The connection is cloned per call; clones share the underlying socket.
#[derive(Clone)]
pub struct RedisBackend {
    connection: MultiplexedConnection,
}

impl RedisBackend {
    /// Open a connection to `url` and check it with `PING`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut connection = client.get_multiplexed_async_connection().await?;
        connection.req_packed_command(&redis::cmd("PING")).await?;
        info!(url, "Connected to redis cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut con = self.connection.clone();
        let value: Option<Vec<u8>> = con.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        con.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        con.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        con.req_packed_command(&redis::cmd("FLUSHDB")).await?;
        Ok(())
    }
}
