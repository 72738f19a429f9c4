//! Lock protocol against a live Redis.
//!
//! Run with: `REDIS_URL=redis://127.0.0.1:6379 cargo test -p employer-incentives-redis -- --ignored`

#![allow(clippy::unwrap_used)]

use employer_incentives_core::services::DistributedLockProvider;
use employer_incentives_core::CancellationToken;
use employer_incentives_redis::{RedisLockProvider, RedisLockSettings};
use std::time::Duration;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn settings() -> RedisLockSettings {
    RedisLockSettings {
        key_prefix: format!("employer-incentives-test:{}:", unique_suffix()),
        ttl: Duration::from_millis(500),
        acquire_timeout: Duration::from_millis(100),
        poll_interval: Duration::from_millis(10),
    }
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn second_holder_waits_until_release() {
    let settings = settings();
    let first = RedisLockProvider::new(&redis_url(), settings.clone()).unwrap();
    let second = RedisLockProvider::new(&redis_url(), settings).unwrap();
    first.start().await.unwrap();
    second.start().await.unwrap();
    let cancel = CancellationToken::new();

    assert!(first.acquire_lock("Account_1", &cancel).await.unwrap());
    assert!(!second.acquire_lock("Account_1", &cancel).await.unwrap());

    first.release_lock("Account_1").await.unwrap();
    assert!(second.acquire_lock("Account_1", &cancel).await.unwrap());
    second.release_lock("Account_1").await.unwrap();

    first.stop().await.unwrap();
    second.stop().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn lease_expires_and_stale_release_does_not_free_the_new_holder() {
    let settings = settings();
    let first = RedisLockProvider::new(&redis_url(), settings.clone()).unwrap();
    let second = RedisLockProvider::new(&redis_url(), settings).unwrap();
    first.start().await.unwrap();
    second.start().await.unwrap();
    let cancel = CancellationToken::new();

    assert!(first.acquire_lock("CollectionCalendar", &cancel).await.unwrap());
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(second.acquire_lock("CollectionCalendar", &cancel).await.unwrap());

    // The first holder's lease is gone; its release must leave the new lease alone.
    first.release_lock("CollectionCalendar").await.unwrap();
    let third = RedisLockProvider::new(&redis_url(), second.settings().clone()).unwrap();
    third.start().await.unwrap();
    assert!(!third.acquire_lock("CollectionCalendar", &cancel).await.unwrap());

    second.release_lock("CollectionCalendar").await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn cancellation_interrupts_the_wait() {
    let mut settings = settings();
    settings.acquire_timeout = Duration::from_secs(10);
    let first = RedisLockProvider::new(&redis_url(), settings.clone()).unwrap();
    let second = RedisLockProvider::new(&redis_url(), settings).unwrap();
    first.start().await.unwrap();
    second.start().await.unwrap();

    assert!(first.acquire_lock("Account_2", &CancellationToken::new()).await.unwrap());

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let acquired = tokio::time::timeout(
        Duration::from_secs(2),
        second.acquire_lock("Account_2", &cancel),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!acquired);

    first.release_lock("Account_2").await.unwrap();
}
