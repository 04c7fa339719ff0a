//! Pub/sub behavior over the memory adapter

use crate::prelude::Note;
use kelp_adapters::MemoryAdapter;
use kelp_core::Bus;
use std::sync::{Arc, Mutex};

fn note(body: &str) -> Note {
    Note {
        body: body.to_string(),
    }
}

#[tokio::test]
async fn independently_built_channels_share_the_stream() {
    let adapter = MemoryAdapter::new();
    let publisher = Bus::new(adapter.clone()).channel::<Note>("updates");
    let subscriber = Bus::new(adapter).channel::<Note>("updates");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    subscriber
        .subscribe(move |message: Note| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(message);
            }
        })
        .await
        .unwrap();

    publisher.publish(&note("hello")).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![note("hello")]);
}

#[tokio::test]
async fn messages_arrive_typed_and_intact() {
    let adapter = MemoryAdapter::new();
    let channel = Bus::new(adapter).channel::<Note>("updates");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    channel
        .subscribe(move |message: Note| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(message);
            }
        })
        .await
        .unwrap();

    channel.publish(&note("first")).await.unwrap();
    channel.publish(&note("second")).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![note("first"), note("second")]);
}

#[tokio::test]
async fn other_channels_stay_silent() {
    let adapter = MemoryAdapter::new();
    let bus = Bus::new(adapter);
    let updates = bus.channel::<Note>("updates");
    let alerts = bus.channel::<Note>("alerts");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    alerts
        .subscribe(move |message: Note| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(message);
            }
        })
        .await
        .unwrap();

    updates.publish(&note("not for alerts")).await.unwrap();

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn releasing_a_subscription_stops_delivery() {
    let adapter = MemoryAdapter::new();
    let channel = Bus::new(adapter).channel::<Note>("updates");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let release = channel
        .subscribe(move |message: Note| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(message);
            }
        })
        .await
        .unwrap();

    channel.publish(&note("before")).await.unwrap();
    release.release().await.unwrap();
    // releasing again is part of the contract
    release.release().await.unwrap();
    channel.publish(&note("after")).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![note("before")]);
}
