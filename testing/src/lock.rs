//! In-memory distributed lock provider.

use employer_incentives_core::services::{DistributedLockProvider, ServiceError, ServiceFuture};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Holder {
    /// Acquired through the provider
    Provider,
    /// Held by someone else; `Some(n)` frees it after `n` more refused attempts
    External(Option<usize>),
}

#[derive(Debug, Default)]
struct LockState {
    held: HashMap<String, Holder>,
    acquisitions: usize,
    contentions: usize,
    releases: usize,
    starts: usize,
    stops: usize,
    unavailable: bool,
}

/// Lock provider backed by a mutex-guarded map.
///
/// Acquisition never waits: a held key is refused immediately, which lets the
/// retry decorator's backoff be observed in tests. Counters record every call.
///
/// # Example
///
/// ```
/// use employer_incentives_core::services::DistributedLockProvider;
/// use employer_incentives_core::CancellationToken;
/// use employer_incentives_testing::InMemoryLockProvider;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let locks = InMemoryLockProvider::new();
/// locks.hold_for_attempts("ApprenticeshipIncentive_1", 1);
///
/// let cancel = CancellationToken::new();
/// assert!(!locks.acquire_lock("ApprenticeshipIncentive_1", &cancel).await?);
/// assert!(locks.acquire_lock("ApprenticeshipIncentive_1", &cancel).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryLockProvider {
    state: Arc<Mutex<LockState>>,
}

#[allow(clippy::unwrap_used)] // Poisoning only follows a panicking test
#[allow(clippy::missing_panics_doc)]
impl InMemoryLockProvider {
    /// Creates a provider with no locks held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as held by another process until [`Self::free`] is called.
    pub fn hold(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .held
            .insert(key.to_string(), Holder::External(None));
    }

    /// Marks `key` as held by another process for the next `attempts` acquisitions.
    pub fn hold_for_attempts(&self, key: &str, attempts: usize) {
        if attempts == 0 {
            return;
        }
        self.state
            .lock()
            .unwrap()
            .held
            .insert(key.to_string(), Holder::External(Some(attempts)));
    }

    /// Frees `key` regardless of holder.
    pub fn free(&self, key: &str) {
        self.state.lock().unwrap().held.remove(key);
    }

    /// Makes every acquisition fail with [`ServiceError::Lock`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// Whether `key` is currently held by anyone.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.state.lock().unwrap().held.contains_key(key)
    }

    /// Successful acquisitions.
    #[must_use]
    pub fn acquisitions(&self) -> usize {
        self.state.lock().unwrap().acquisitions
    }

    /// Refused acquisitions.
    #[must_use]
    pub fn contentions(&self) -> usize {
        self.state.lock().unwrap().contentions
    }

    /// Releases of provider-held locks.
    #[must_use]
    pub fn releases(&self) -> usize {
        self.state.lock().unwrap().releases
    }

    /// Calls to `start`.
    #[must_use]
    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    /// Calls to `stop`.
    #[must_use]
    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    fn try_acquire(&self, key: &str) -> Result<bool, ServiceError> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(ServiceError::Lock("lock store unavailable".to_string()));
        }

        match state.held.get(key).copied() {
            None => {
                state.held.insert(key.to_string(), Holder::Provider);
                state.acquisitions += 1;
                Ok(true)
            }
            Some(Holder::External(Some(remaining))) => {
                if remaining <= 1 {
                    state.held.remove(key);
                } else {
                    state
                        .held
                        .insert(key.to_string(), Holder::External(Some(remaining - 1)));
                }
                state.contentions += 1;
                Ok(false)
            }
            Some(Holder::Provider | Holder::External(None)) => {
                state.contentions += 1;
                Ok(false)
            }
        }
    }

    fn release(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        if state.held.get(key) == Some(&Holder::Provider) {
            state.held.remove(key);
            state.releases += 1;
        }
    }
}

impl DistributedLockProvider for InMemoryLockProvider {
    #[allow(clippy::unwrap_used)]
    fn start(&self) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.state.lock().unwrap().starts += 1;
            Ok(())
        })
    }

    fn acquire_lock<'a>(
        &'a self,
        key: &'a str,
        cancel: &'a CancellationToken,
    ) -> ServiceFuture<'a, bool> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            self.try_acquire(key)
        })
    }

    fn release_lock<'a>(&'a self, key: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.release(key);
            Ok(())
        })
    }

    #[allow(clippy::unwrap_used)]
    fn stop(&self) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.state.lock().unwrap().stops += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquisition_is_refused_until_release() {
        let locks = InMemoryLockProvider::new();
        let cancel = CancellationToken::new();

        assert!(locks.acquire_lock("k", &cancel).await.unwrap());
        assert!(!locks.acquire_lock("k", &cancel).await.unwrap());

        locks.release_lock("k").await.unwrap();
        assert!(locks.acquire_lock("k", &cancel).await.unwrap());
        assert_eq!(locks.acquisitions(), 2);
        assert_eq!(locks.contentions(), 1);
        assert_eq!(locks.releases(), 1);
    }

    #[tokio::test]
    async fn external_hold_is_not_released_by_the_provider() {
        let locks = InMemoryLockProvider::new();
        locks.hold("k");

        locks.release_lock("k").await.unwrap();
        assert!(locks.is_held("k"));
        assert_eq!(locks.releases(), 0);

        locks.free("k");
        assert!(!locks.is_held("k"));
    }

    #[tokio::test]
    async fn cancelled_token_refuses_without_acquiring() {
        let locks = InMemoryLockProvider::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!locks.acquire_lock("k", &cancel).await.unwrap());
        assert!(!locks.is_held("k"));
    }

    #[tokio::test]
    async fn unavailable_store_errors() {
        let locks = InMemoryLockProvider::new();
        locks.set_unavailable(true);
        let result = locks.acquire_lock("k", &CancellationToken::new()).await;
        assert!(matches!(result, Err(ServiceError::Lock(_))));
    }
}
