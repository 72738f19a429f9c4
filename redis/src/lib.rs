//! # Employer Incentives Redis
//!
//! Redis implementation of [`DistributedLockProvider`].
//!
//! # Protocol
//!
//! - **Acquire**: `SET {prefix}{key} {token} NX PX {ttl}`, polled every
//!   `poll_interval` until `acquire_timeout` elapses or the token is cancelled
//! - **Release**: a Lua script deletes the key only if it still holds this
//!   process's token, so an expired lease re-acquired elsewhere is never freed
//! - **Lease**: a holder that dies without releasing loses the lock after `ttl`.
//!   Leases are never renewed, so `ttl` must exceed the longest handler run;
//!   a handler still running when its lease expires no longer excludes others
//!
//! # Example
//!
//! ```no_run
//! use employer_incentives_core::services::DistributedLockProvider;
//! use employer_incentives_core::CancellationToken;
//! use employer_incentives_redis::{RedisLockProvider, RedisLockSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let locks = RedisLockProvider::new("redis://127.0.0.1:6379", RedisLockSettings::default())?;
//! locks.start().await?;
//!
//! if locks.acquire_lock("ApprenticeshipIncentive_42", &CancellationToken::new()).await? {
//!     // ... mutate the incentive ...
//!     locks.release_lock("ApprenticeshipIncentive_42").await?;
//! }
//! locks.stop().await?;
//! # Ok(())
//! # }
//! ```

use employer_incentives_core::services::{DistributedLockProvider, ServiceError, ServiceFuture};
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Deletes `KEYS[1]` only if its value is `ARGV[1]`.
const RELEASE_SCRIPT: &str = r"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    end
    return 0
";

/// Lock timing and naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisLockSettings {
    /// Prefix for every lock key
    pub key_prefix: String,
    /// Lease length. Not renewed while held, so it must be longer than the
    /// slowest command handler.
    pub ttl: Duration,
    /// How long one acquisition waits for a held lock
    pub acquire_timeout: Duration,
    /// Polling interval while waiting
    pub poll_interval: Duration,
}

impl Default for RedisLockSettings {
    fn default() -> Self {
        Self {
            key_prefix: "employer-incentives:lock:".to_string(),
            ttl: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Distributed lock provider backed by Redis.
///
/// The connection is opened by `start` and dropped by `stop`; acquiring before
/// `start` fails with [`ServiceError::Lock`].
pub struct RedisLockProvider {
    client: Client,
    settings: RedisLockSettings,
    /// Connection manager, present between `start` and `stop`.
    connection: RwLock<Option<ConnectionManager>>,
    /// Token per key for the leases this process holds.
    tokens: Mutex<HashMap<String, String>>,
}

impl RedisLockProvider {
    /// Create a provider for `redis_url`. No connection is made until `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lock`] if the URL is invalid.
    pub fn new(redis_url: &str, settings: RedisLockSettings) -> Result<Self, ServiceError> {
        let client = Client::open(redis_url)
            .map_err(|e| ServiceError::Lock(format!("Failed to create Redis client: {e}")))?;

        Ok(Self {
            client,
            settings,
            connection: RwLock::new(None),
            tokens: Mutex::new(HashMap::new()),
        })
    }

    /// The lock settings.
    #[must_use]
    pub const fn settings(&self) -> &RedisLockSettings {
        &self.settings
    }

    /// Redis key for a lock name.
    #[must_use]
    pub fn redis_key(&self, key: &str) -> String {
        format!("{}{key}", self.settings.key_prefix)
    }

    fn ttl_ms(&self) -> u64 {
        u64::try_from(self.settings.ttl.as_millis()).unwrap_or(u64::MAX)
    }

    async fn connection(&self) -> Result<ConnectionManager, ServiceError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| ServiceError::Lock("Redis lock provider not started".to_string()))
    }

    fn remember(&self, key: &str, token: String) -> Result<(), ServiceError> {
        self.tokens
            .lock()
            .map_err(|_| ServiceError::Lock("lock token table poisoned".to_string()))?
            .insert(key.to_string(), token);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self
            .tokens
            .lock()
            .map_err(|_| ServiceError::Lock("lock token table poisoned".to_string()))?
            .remove(key))
    }

    async fn try_set(
        &self,
        conn: &mut ConnectionManager,
        redis_key: &str,
        token: &str,
    ) -> Result<bool, ServiceError> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(redis_key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl_ms())
            .query_async(conn)
            .await
            .map_err(|e| ServiceError::Lock(format!("Failed to acquire lock {redis_key}: {e}")))?;
        Ok(reply.is_some())
    }
}

impl DistributedLockProvider for RedisLockProvider {
    fn start(&self) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            if self.connection.read().await.is_some() {
                return Ok(());
            }

            let mut connection = self.connection.write().await;
            if connection.is_none() {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| {
                        ServiceError::Lock(format!("Failed to connect to Redis: {e}"))
                    })?;
                *connection = Some(manager);
                tracing::info!("Redis lock provider started");
            }
            Ok(())
        })
    }

    /// Takes a lease of `settings.ttl`. The lease is not extended while the
    /// caller works; once it expires another process may take the key.
    fn acquire_lock<'a>(
        &'a self,
        key: &'a str,
        cancel: &'a CancellationToken,
    ) -> ServiceFuture<'a, bool> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let redis_key = self.redis_key(key);
            let token = Uuid::new_v4().to_string();
            let deadline = Instant::now() + self.settings.acquire_timeout;

            loop {
                if self.try_set(&mut conn, &redis_key, &token).await? {
                    self.remember(key, token)?;
                    tracing::debug!(lock_id = key, ttl_ms = self.ttl_ms(), "Redis lock acquired");
                    return Ok(true);
                }

                if Instant::now() >= deadline {
                    tracing::debug!(lock_id = key, "Redis lock still held after timeout");
                    return Ok(false);
                }

                tokio::select! {
                    () = cancel.cancelled() => return Ok(false),
                    () = sleep(self.settings.poll_interval) => {}
                }
            }
        })
    }

    fn release_lock<'a>(&'a self, key: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let Some(token) = self.forget(key)? else {
                tracing::debug!(lock_id = key, "No lease held for lock");
                return Ok(());
            };

            let mut conn = self.connection().await?;
            let redis_key = self.redis_key(key);
            let deleted: i64 = Script::new(RELEASE_SCRIPT)
                .key(&redis_key)
                .arg(&token)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| {
                    ServiceError::Lock(format!("Failed to release lock {redis_key}: {e}"))
                })?;

            if deleted == 0 {
                tracing::warn!(lock_id = key, "Lease expired before release");
            } else {
                tracing::debug!(lock_id = key, "Redis lock released");
            }
            Ok(())
        })
    }

    fn stop(&self) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            if self.connection.write().await.take().is_some() {
                tracing::info!("Redis lock provider stopped");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_rejected() {
        let result = RedisLockProvider::new("not a url", RedisLockSettings::default());
        assert!(matches!(result, Err(ServiceError::Lock(_))));
    }

    #[test]
    fn keys_carry_the_prefix() {
        let provider =
            RedisLockProvider::new("redis://127.0.0.1:6379", RedisLockSettings::default()).unwrap();
        assert_eq!(
            provider.redis_key("CollectionCalendar"),
            "employer-incentives:lock:CollectionCalendar"
        );
        assert_eq!(provider.ttl_ms(), 30_000);
    }

    #[tokio::test]
    async fn acquiring_before_start_fails() {
        let provider =
            RedisLockProvider::new("redis://127.0.0.1:6379", RedisLockSettings::default()).unwrap();
        let result = provider
            .acquire_lock("Account_1", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ServiceError::Lock(_))));
    }

    #[tokio::test]
    async fn releasing_an_unheld_lock_is_a_no_op() {
        let provider =
            RedisLockProvider::new("redis://127.0.0.1:6379", RedisLockSettings::default()).unwrap();
        assert!(provider.release_lock("Account_1").await.is_ok());
    }
}
