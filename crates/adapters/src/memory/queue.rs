// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue capability for the memory adapter
//!
//! Items wait in a per-channel store with priority ordering (higher first,
//! FIFO within a priority) and delayed readiness. Each consume registration
//! spawns a dispatcher task bounded by a semaphore of `max_parallel`
//! permits. Settling rules for the message a handler returns:
//! done -> acknowledged, a delay hint -> redelivered after the hint,
//! failed without a hint -> dead-letter list.

use super::{MemoryAdapter, MemoryState};
use async_trait::async_trait;
use kelp_core::{AdapterError, MessageSchema, QueueAdapter, QueueHandler, QueueMessage, Release};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify, Semaphore};
use tokio::time::Instant;

pub(super) struct QueueState {
    items: Vec<QueueItem>,
    dead_letters: Vec<QueueMessage<Value>>,
    wake: Arc<Notify>,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            dead_letters: Vec::new(),
            wake: Arc::new(Notify::new()),
        }
    }
}

struct QueueItem {
    payload: Value,
    priority: i32,
    ready_at: Instant,
    tries: u32,
}

impl MemoryAdapter {
    /// Messages that failed without a redelivery hint
    pub fn dead_letters(&self, channel: &str) -> Vec<QueueMessage<Value>> {
        let queues = self.state.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues
            .get(channel)
            .map(|q| q.dead_letters.clone())
            .unwrap_or_default()
    }

    /// Items waiting on a channel, ready or delayed
    pub fn queued_count(&self, channel: &str) -> usize {
        let queues = self.state.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.get(channel).map_or(0, |q| q.items.len())
    }
}

#[async_trait]
impl QueueAdapter for MemoryAdapter {
    async fn produce(
        &self,
        channel: &str,
        _schema: &MessageSchema,
        payload: Value,
        delay: Duration,
        priority: i32,
    ) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let wake = {
            let mut queues = self.state.queues.lock().unwrap_or_else(|e| e.into_inner());
            let queue = queues.entry(channel.to_string()).or_default();
            queue.items.push(QueueItem {
                payload,
                priority,
                ready_at: Instant::now() + delay,
                tries: 0,
            });
            Arc::clone(&queue.wake)
        };
        wake.notify_one();
        Ok(())
    }

    async fn consume(
        &self,
        channel: &str,
        _schema: &MessageSchema,
        handler: QueueHandler,
        max_parallel: usize,
    ) -> Result<Release, AdapterError> {
        self.ensure_connected()?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let stop_tx = Arc::new(stop_tx);
        self.state
            .consumer_stops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&stop_tx));

        let wake = {
            let mut queues = self.state.queues.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(&queues.entry(channel.to_string()).or_default().wake)
        };

        let dispatcher = Dispatcher {
            state: Arc::clone(&self.state),
            channel: channel.to_string(),
            handler,
            limit: Arc::new(Semaphore::new(max_parallel.max(1))),
            wake,
            stop: stop_rx,
        };
        tokio::spawn(dispatcher.run());

        Ok(Release::new(move || async move {
            // stops future deliveries; in-flight callbacks run to completion
            let _ = stop_tx.send(true);
            Ok(())
        }))
    }
}

/// Per-registration delivery loop
struct Dispatcher {
    state: Arc<MemoryState>,
    channel: String,
    handler: QueueHandler,
    limit: Arc<Semaphore>,
    wake: Arc<Notify>,
    stop: watch::Receiver<bool>,
}

enum NextStep {
    Ready(QueueItem),
    Wait(Instant),
    Idle,
}

impl Dispatcher {
    async fn run(mut self) {
        loop {
            if *self.stop.borrow() || self.state.disconnected.load(Ordering::SeqCst) {
                break;
            }
            match self.next_step() {
                NextStep::Ready(item) => {
                    let Ok(permit) = Arc::clone(&self.limit).acquire_owned().await else {
                        break;
                    };
                    let state = Arc::clone(&self.state);
                    let handler = Arc::clone(&self.handler);
                    let channel = self.channel.clone();
                    let priority = item.priority;
                    tokio::spawn(async move {
                        let mut delivered = QueueMessage::new(channel.clone(), item.payload);
                        delivered.tries = item.tries + 1;
                        let settled = handler(delivered).await;
                        settle(&state, &channel, priority, settled);
                        drop(permit);
                    });
                }
                NextStep::Wait(until) => {
                    let wake = Arc::clone(&self.wake);
                    let notified = wake.notified();
                    tokio::select! {
                        _ = self.stop.changed() => break,
                        _ = tokio::time::timeout_at(until, notified) => {}
                    }
                }
                NextStep::Idle => {
                    let wake = Arc::clone(&self.wake);
                    let notified = wake.notified();
                    tokio::select! {
                        _ = self.stop.changed() => break,
                        _ = notified => {}
                    }
                }
            }
        }
        tracing::debug!(channel = %self.channel, "consumer dispatcher stopped");
    }

    /// Pick the next deliverable item: highest priority among ready ones,
    /// FIFO within a priority. Otherwise report how long until one is due.
    fn next_step(&self) -> NextStep {
        let mut queues = self.state.queues.lock().unwrap_or_else(|e| e.into_inner());
        let Some(queue) = queues.get_mut(&self.channel) else {
            return NextStep::Idle;
        };
        let now = Instant::now();

        let mut best: Option<usize> = None;
        let mut soonest: Option<Instant> = None;
        for (index, item) in queue.items.iter().enumerate() {
            if item.ready_at <= now {
                let better = match best {
                    Some(current) => item.priority > queue.items[current].priority,
                    None => true,
                };
                if better {
                    best = Some(index);
                }
            } else {
                soonest = Some(soonest.map_or(item.ready_at, |s| s.min(item.ready_at)));
            }
        }

        match best {
            Some(index) => NextStep::Ready(queue.items.remove(index)),
            None => match soonest {
                Some(at) => NextStep::Wait(at),
                None => NextStep::Idle,
            },
        }
    }
}

/// Apply a settled message back to the queue: ack, redeliver, or
/// dead-letter
fn settle(state: &Arc<MemoryState>, channel: &str, priority: i32, message: QueueMessage<Value>) {
    let redeliver = message.delayed > Duration::ZERO && !message.is_done();
    if redeliver {
        tracing::debug!(channel, tries = message.tries, "message scheduled for redelivery");
        let wake = {
            let mut queues = state.queues.lock().unwrap_or_else(|e| e.into_inner());
            let queue = queues.entry(channel.to_string()).or_default();
            queue.items.push(QueueItem {
                payload: message.data,
                priority,
                ready_at: Instant::now() + message.delayed,
                tries: message.tries,
            });
            Arc::clone(&queue.wake)
        };
        wake.notify_one();
    } else if message.is_failed() {
        tracing::warn!(
            channel,
            error = message.error.as_deref().unwrap_or("unknown"),
            "message dead-lettered"
        );
        let mut queues = state.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues
            .entry(channel.to_string())
            .or_default()
            .dead_letters
            .push(message);
    }
    // done, or pending without a delay hint: acknowledged and dropped
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
