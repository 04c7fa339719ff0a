//! Key/value and cache-invalidation behavior over the memory adapter

use kelp_adapters::MemoryAdapter;
use kelp_core::{
    AdapterBase, AdapterError, CacheAdapter, CacheInvalidation, InvalidationHandler,
    KeyValueAdapter,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn values_round_trip_and_increment_atomically() {
    let adapter = MemoryAdapter::new();

    adapter
        .set("session:9", json!({"user": "otter"}), Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(
        adapter.get("session:9").await.unwrap(),
        Some(json!({"user": "otter"}))
    );

    assert_eq!(adapter.increment("visits", 1).await.unwrap(), 1);
    assert_eq!(adapter.increment("visits", 1).await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn entries_vanish_after_their_ttl() {
    let adapter = MemoryAdapter::new();
    adapter
        .set("session:9", json!(1), Duration::from_secs(1))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(adapter.get("session:9").await.unwrap(), None);
}

#[tokio::test]
async fn invalidation_evicts_and_announces() {
    let adapter = MemoryAdapter::new();
    adapter
        .set("user:1", json!({"name": "otter"}), Duration::ZERO)
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: InvalidationHandler = Arc::new(move |message: CacheInvalidation| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            sink.lock().unwrap().push((message.key, message.ttl));
        })
    });
    adapter.on_invalidate(handler).await.unwrap();

    adapter
        .invalidate(&CacheInvalidation::new("user:1", Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!(adapter.get("user:1").await.unwrap(), None);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("user:1".to_string(), Duration::from_secs(60))]
    );
}

#[tokio::test]
async fn disconnect_is_terminal() {
    let adapter = MemoryAdapter::new();
    adapter.set("k", json!(1), Duration::ZERO).await.unwrap();
    adapter.disconnect().await.unwrap();

    assert!(matches!(
        adapter.get("k").await,
        Err(AdapterError::Disconnected)
    ));
    assert!(matches!(
        adapter.set("k", json!(2), Duration::ZERO).await,
        Err(AdapterError::Disconnected)
    ));
    assert!(matches!(
        adapter.disconnect().await,
        Err(AdapterError::Disconnected)
    ));
}
