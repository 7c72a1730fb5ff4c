//! Redis-backed seen store

use crate::config::DedupConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::SeenStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Default per-command timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

/// Seen store over a shared Redis connection manager.
///
/// The connection manager is multiplexed and cheap to clone; the store never
/// closes it. Every command is bounded by `command_timeout` and an elapsed
/// timeout is reported as [`StoreError::Timeout`].
#[derive(Clone)]
pub struct RedisSeenStore {
    redis: ConnectionManager,
    command_timeout: Duration,
}

impl RedisSeenStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Open a connection manager for `redis_url`
    pub async fn connect(
        redis_url: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;

        let manager = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout {
                operation: "CONNECT",
                timeout: connect_timeout,
            })??;

        info!(
            command_timeout_ms = command_timeout.as_millis() as u64,
            "Connected dedup seen store to Redis"
        );

        Ok(Self::new(manager).with_command_timeout(command_timeout))
    }

    pub async fn from_config(config: &DedupConfig) -> StoreResult<Self> {
        Self::connect(
            &config.redis_url,
            config.connect_timeout(),
            config.command_timeout(),
        )
        .await
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout: self.command_timeout,
            }),
        }
    }
}

#[async_trait]
impl SeenStore for RedisSeenStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.redis.clone();
        let count: i64 = self.bounded("EXISTS", conn.exists(key)).await?;
        Ok(count > 0)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        let mut conn = self.redis.clone();
        self.bounded("SETEX", conn.set_ex::<_, _, ()>(key, value, ttl_secs))
            .await?;
        debug!(key = %key, ttl_secs, "SETEX seen marker");
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<bool> {
        let mut conn = self.redis.clone();
        let reply: Option<String> = self
            .bounded(
                "SET NX EX",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs)
                    .query_async(&mut conn),
            )
            .await?;

        let created = reply.is_some();
        debug!(key = %key, ttl_secs, created, "SET NX EX seen marker");
        Ok(created)
    }
}
