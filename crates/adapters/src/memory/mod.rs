// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process backend implementing every capability set on tokio
//!
//! Suitable for tests, development, and single-process deployments. Locks,
//! subscriptions, queues, and keys live in shared maps behind one adapter;
//! clones of the adapter see the same state, so separately constructed
//! primitives coordinate with each other.

mod bus;
mod kv;
mod lock;
mod queue;

use async_trait::async_trait;
use kelp_core::{AdapterBase, AdapterError, BusHandler, InvalidationHandler};
use kv::KvEntry;
use lock::LockEntry;
use queue::QueueState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use uuid::Uuid;

/// Shared state behind the memory adapter
struct MemoryState {
    locks: Mutex<HashMap<String, LockEntry>>,
    /// Wakes lock waiters whenever any lock is freed
    lock_freed: Notify,
    subscribers: Mutex<HashMap<String, Vec<(Uuid, BusHandler)>>>,
    queues: Mutex<HashMap<String, QueueState>>,
    kv: Mutex<HashMap<String, KvEntry>>,
    invalidation_handlers: Mutex<Vec<(Uuid, InvalidationHandler)>>,
    /// Stop signals for every consumer dispatcher, drained on disconnect
    consumer_stops: Mutex<Vec<Arc<watch::Sender<bool>>>>,
    disconnected: AtomicBool,
}

/// In-memory adapter; clones share state
#[derive(Clone)]
pub struct MemoryAdapter {
    state: Arc<MemoryState>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MemoryState {
                locks: Mutex::new(HashMap::new()),
                lock_freed: Notify::new(),
                subscribers: Mutex::new(HashMap::new()),
                queues: Mutex::new(HashMap::new()),
                kv: Mutex::new(HashMap::new()),
                invalidation_handlers: Mutex::new(Vec::new()),
                consumer_stops: Mutex::new(Vec::new()),
                disconnected: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_connected(&self) -> Result<(), AdapterError> {
        if self.state.disconnected.load(Ordering::SeqCst) {
            return Err(AdapterError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl AdapterBase for MemoryAdapter {
    async fn disconnect(&self) -> Result<(), AdapterError> {
        if self.state.disconnected.swap(true, Ordering::SeqCst) {
            return Err(AdapterError::Disconnected);
        }

        // stop every consumer dispatcher; in-flight callbacks run to
        // completion
        let stops: Vec<Arc<watch::Sender<bool>>> = {
            let mut consumer_stops = self
                .state
                .consumer_stops
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            consumer_stops.drain(..).collect()
        };
        for stop in stops {
            let _ = stop.send(true);
        }

        // wake lock waiters so they observe the shutdown
        self.state.lock_freed.notify_waiters();

        tracing::debug!("memory adapter disconnected");
        Ok(())
    }
}
