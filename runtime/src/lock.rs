//! Distributed lock decorator.

use employer_incentives_core::services::DistributedLockProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::error::CommandError;
use crate::handler::{CommandHandler, HandlerFuture};
use crate::metrics::PipelineMetrics;

/// Holds the command's lock for the duration of the inner handler.
///
/// Commands without a lock id pass straight through. A lock held elsewhere
/// fails with [`CommandError::EntityLocked`], which the retry decorator retries.
pub struct WithDistributedLock<H> {
    inner: H,
    provider: Arc<dyn DistributedLockProvider>,
}

impl<H> WithDistributedLock<H> {
    /// Wraps `inner`, locking through `provider`.
    #[must_use]
    pub fn new(inner: H, provider: Arc<dyn DistributedLockProvider>) -> Self {
        Self { inner, provider }
    }
}

/// A lock this process holds.
///
/// Released explicitly on every normal exit. If the handling future is dropped
/// while the lock is held, the release is spawned onto the current runtime.
struct HeldLock {
    provider: Arc<dyn DistributedLockProvider>,
    key: Option<String>,
}

impl HeldLock {
    async fn release(mut self) {
        if let Some(key) = self.key.take() {
            release(self.provider.as_ref(), &key).await;
        }
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    release(provider.as_ref(), &key).await;
                });
            }
            Err(_) => {
                tracing::warn!(lock_id = %key, "Lock dropped outside a runtime; left to expire");
            }
        }
    }
}

async fn release(provider: &dyn DistributedLockProvider, key: &str) {
    match provider.release_lock(key).await {
        Ok(()) => tracing::debug!(lock_id = key, "Lock released"),
        Err(error) => tracing::error!(lock_id = key, error = %error, "Failed to release lock"),
    }
}

impl<C: Command, H: CommandHandler<C>> CommandHandler<C> for WithDistributedLock<H> {
    fn handle<'a>(&'a self, command: &'a C, cancel: &'a CancellationToken) -> HandlerFuture<'a> {
        Box::pin(async move {
            let Some(lock_id) = command.lock_id() else {
                return self.inner.handle(command, cancel).await;
            };
            let command_type = command.command_type();

            self.provider.start().await?;

            if !self.provider.acquire_lock(&lock_id, cancel).await? {
                if cancel.is_cancelled() {
                    return Err(CommandError::Cancelled);
                }
                tracing::debug!(command = command_type, lock_id = %lock_id, "Lock is held elsewhere");
                PipelineMetrics::record_lock_contention(command_type);
                return Err(CommandError::EntityLocked {
                    command: command_type,
                    lock_id,
                });
            }

            tracing::debug!(command = command_type, lock_id = %lock_id, "Lock acquired");
            let held = HeldLock {
                provider: Arc::clone(&self.provider),
                key: Some(lock_id),
            };

            let result = self.inner.handle(command, cancel).await;
            held.release().await;
            result
        })
    }
}
