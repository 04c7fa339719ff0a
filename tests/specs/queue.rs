//! Queue behavior over the memory adapter

use crate::prelude::{eventually, Job};
use kelp_adapters::MemoryAdapter;
use kelp_core::{ConsumeOptions, ProduceOptions, Queue, QueueMessage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn produced_jobs_are_consumed() {
    let adapter = MemoryAdapter::new();
    let channel = Queue::new(adapter).channel::<Job>("invoices");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    channel
        .consume(
            move |message: &mut QueueMessage<Job>| {
                let sink = Arc::clone(&sink);
                Box::pin(async move {
                    sink.lock().unwrap().push(message.data.id);
                    Ok(())
                })
            },
            ConsumeOptions::default(),
        )
        .await
        .unwrap();

    for id in 1..=3 {
        channel
            .produce(&Job { id }, ProduceOptions::default())
            .await
            .unwrap();
    }

    let counter = Arc::clone(&seen);
    eventually(move || counter.lock().unwrap().len() == 3).await;
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn a_failing_job_does_not_stop_the_consumer() {
    let adapter = MemoryAdapter::new();
    let channel = Queue::new(adapter.clone()).channel::<Job>("invoices");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    channel
        .consume(
            move |message: &mut QueueMessage<Job>| {
                let sink = Arc::clone(&sink);
                Box::pin(async move {
                    if message.data.id == 2 {
                        return Err("id 2 is cursed".into());
                    }
                    sink.lock().unwrap().push(message.data.id);
                    Ok(())
                })
            },
            ConsumeOptions::default(),
        )
        .await
        .unwrap();

    for id in 1..=3 {
        channel
            .produce(&Job { id }, ProduceOptions::default())
            .await
            .unwrap();
    }

    let counter = Arc::clone(&seen);
    eventually(move || counter.lock().unwrap().len() == 2).await;
    assert_eq!(*seen.lock().unwrap(), vec![1, 3]);

    let probe = adapter.clone();
    eventually(move || !probe.dead_letters("invoices").is_empty()).await;
    let dead = adapter.dead_letters("invoices");
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].error.as_deref(), Some("id 2 is cursed"));

    // the registration is still live for later messages
    channel
        .produce(&Job { id: 4 }, ProduceOptions::default())
        .await
        .unwrap();
    let counter = Arc::clone(&seen);
    eventually(move || counter.lock().unwrap().contains(&4)).await;
}

#[tokio::test(start_paused = true)]
async fn delayed_jobs_arrive_after_the_delay() {
    let adapter = MemoryAdapter::new();
    let channel = Queue::new(adapter).channel::<Job>("invoices");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    channel
        .consume(
            move |message: &mut QueueMessage<Job>| {
                let sink = Arc::clone(&sink);
                Box::pin(async move {
                    sink.lock().unwrap().push(message.data.id);
                    Ok(())
                })
            },
            ConsumeOptions::default(),
        )
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    channel
        .produce(&Job { id: 1 }, ProduceOptions::new().with_delay("1s"))
        .await
        .unwrap();

    let counter = Arc::clone(&seen);
    eventually(move || counter.lock().unwrap().len() == 1).await;
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn higher_priority_jobs_jump_the_queue() {
    let adapter = MemoryAdapter::new();
    let channel = Queue::new(adapter).channel::<Job>("invoices");

    // both are queued before the consumer starts
    channel
        .produce(&Job { id: 1 }, ProduceOptions::default())
        .await
        .unwrap();
    channel
        .produce(&Job { id: 2 }, ProduceOptions::new().with_priority(5))
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    channel
        .consume(
            move |message: &mut QueueMessage<Job>| {
                let sink = Arc::clone(&sink);
                Box::pin(async move {
                    sink.lock().unwrap().push(message.data.id);
                    Ok(())
                })
            },
            ConsumeOptions::default(),
        )
        .await
        .unwrap();

    let counter = Arc::clone(&seen);
    eventually(move || counter.lock().unwrap().len() == 2).await;
    assert_eq!(*seen.lock().unwrap(), vec![2, 1]);
}

#[tokio::test(start_paused = true)]
async fn a_delay_hint_on_failure_retries_the_job() {
    let adapter = MemoryAdapter::new();
    let channel = Queue::new(adapter.clone()).channel::<Job>("invoices");

    let tries = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&tries);
    channel
        .consume(
            move |message: &mut QueueMessage<Job>| {
                let sink = Arc::clone(&sink);
                Box::pin(async move {
                    sink.lock().unwrap().push(message.tries);
                    if message.tries == 1 {
                        message.delay(Duration::from_millis(200));
                        return Err("transient".into());
                    }
                    Ok(())
                })
            },
            ConsumeOptions::default(),
        )
        .await
        .unwrap();

    channel
        .produce(&Job { id: 1 }, ProduceOptions::default())
        .await
        .unwrap();

    let counter = Arc::clone(&tries);
    eventually(move || counter.lock().unwrap().len() == 2).await;
    assert_eq!(*tries.lock().unwrap(), vec![1, 2]);
    // the retried run succeeded, so nothing dead-letters
    assert!(adapter.dead_letters("invoices").is_empty());
}

#[tokio::test(start_paused = true)]
async fn releasing_the_consumer_stops_deliveries() {
    let adapter = MemoryAdapter::new();
    let channel = Queue::new(adapter.clone()).channel::<Job>("invoices");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let release = channel
        .consume(
            move |message: &mut QueueMessage<Job>| {
                let sink = Arc::clone(&sink);
                Box::pin(async move {
                    sink.lock().unwrap().push(message.data.id);
                    Ok(())
                })
            },
            ConsumeOptions::default(),
        )
        .await
        .unwrap();

    release.release().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    channel
        .produce(&Job { id: 1 }, ProduceOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(adapter.queued_count("invoices"), 1);
}
