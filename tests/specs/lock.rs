//! Lock behavior over the memory adapter

use kelp_adapters::MemoryAdapter;
use kelp_core::{AdapterError, Event, EventBus, EventPattern, Lock, LockError, Subscription, TimeOptions};
use std::time::Duration;

#[tokio::test]
async fn competing_handles_exclude_each_other() {
    let adapter = MemoryAdapter::new();
    let lock = Lock::new(adapter);
    let mut first = lock.item("reports", TimeOptions::new()).unwrap();
    let mut second = lock.item("reports", TimeOptions::new()).unwrap();

    first.acquire().await.unwrap();
    assert!(!second.try_acquire().await.unwrap());
    assert!(second.is_reserved().await.unwrap());

    first.release().await.unwrap();
    assert!(second.try_acquire().await.unwrap());
    second.release().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn acquire_waits_for_the_current_holder() {
    let adapter = MemoryAdapter::new();
    let lock = Lock::new(adapter);
    let mut holder = lock.item("reports", TimeOptions::new()).unwrap();
    holder.acquire().await.unwrap();

    let waiting_lock = lock.clone();
    let waiter = tokio::spawn(async move {
        let mut item = waiting_lock
            .item("reports", TimeOptions::new().with_timeout("10s"))
            .unwrap();
        item.acquire().await.map(|_| ())
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    holder.release().await.unwrap();

    waiter.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn acquisition_times_out_with_the_adapter_error() {
    let adapter = MemoryAdapter::new();
    let lock = Lock::new(adapter);
    let mut holder = lock.item("reports", TimeOptions::new()).unwrap();
    holder.acquire().await.unwrap();

    let mut contender = lock
        .item("reports", TimeOptions::new().with_timeout("200ms"))
        .unwrap();
    let err = contender.acquire().await.unwrap_err();

    assert!(matches!(
        err,
        LockError::Adapter(AdapterError::Timeout { .. })
    ));
    assert!(!contender.is_acquired());
}

#[tokio::test(start_paused = true)]
async fn unreleased_locks_expire_by_ttl() {
    let adapter = MemoryAdapter::new();
    let lock = Lock::new(adapter);
    let mut holder = lock
        .item("reports", TimeOptions::new().with_ttl("1s"))
        .unwrap();
    holder.acquire().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let mut contender = lock.item("reports", TimeOptions::new()).unwrap();
    assert!(contender.try_acquire().await.unwrap());
}

#[tokio::test]
async fn double_acquire_is_rejected_locally() {
    let adapter = MemoryAdapter::new();
    let lock = Lock::new(adapter);
    let mut item = lock.item("reports", TimeOptions::new()).unwrap();

    item.acquire().await.unwrap();
    assert!(matches!(
        item.acquire().await,
        Err(LockError::AlreadyAcquired(_))
    ));
    assert!(matches!(
        item.try_acquire().await,
        Err(LockError::AlreadyAcquired(_))
    ));
}

#[tokio::test]
async fn repeated_release_is_harmless() {
    let adapter = MemoryAdapter::new();
    let lock = Lock::new(adapter);
    let mut item = lock.item("reports", TimeOptions::new()).unwrap();

    item.acquire().await.unwrap();
    item.release().await.unwrap();
    item.release().await.unwrap();
    assert!(!item.is_acquired());

    // the lock is genuinely free again
    let mut next = lock.item("reports", TimeOptions::new()).unwrap();
    assert!(next.try_acquire().await.unwrap());
}

#[tokio::test]
async fn lock_activity_reaches_event_subscribers() {
    let adapter = MemoryAdapter::new();
    let events = EventBus::new();
    let mut observed = events.subscribe(Subscription::new(
        "spec",
        vec![EventPattern::new("lock:*")],
    ));

    let lock = Lock::new(adapter).with_events(events);
    let mut item = lock.item("reports", TimeOptions::new()).unwrap();
    item.acquire().await.unwrap();
    item.release().await.unwrap();

    assert_eq!(
        observed.try_recv().unwrap(),
        Event::LockAcquired {
            name: "reports".to_string()
        }
    );
    assert_eq!(
        observed.try_recv().unwrap(),
        Event::LockReleased {
            name: "reports".to_string()
        }
    );
}
