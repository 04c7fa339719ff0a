// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability contracts a backend adapter may implement
//!
//! Each trait is a minimal, orthogonal contract. A concrete backend declares
//! the subsets it satisfies, and every primitive factory accepts the
//! narrowest one it needs; `Adapter` is the intersection of all five.

use crate::cache::CacheInvalidation;
use crate::message::{MessageSchema, QueueMessage};
use crate::release::Release;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed future used by adapter-facing handler callbacks
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Callback invoked for each message delivered to a bus subscription
pub type BusHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Callback invoked for each delivered queue message
///
/// Returns the message with its settled state so the backend can ack,
/// retry, or dead-letter it.
pub type QueueHandler =
    Arc<dyn Fn(QueueMessage<Value>) -> BoxFuture<'static, QueueMessage<Value>> + Send + Sync>;

/// Callback invoked for each cache invalidation announcement
pub type InvalidationHandler =
    Arc<dyn Fn(CacheInvalidation) -> BoxFuture<'static, ()> + Send + Sync>;

/// Errors surfaced by backend adapters
///
/// The primitives pass these through to callers unmodified.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Acquisition did not complete within the caller's timeout
    #[error("lock '{name}' acquisition timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
    /// The adapter was shut down with `disconnect`
    #[error("adapter is disconnected")]
    Disconnected,
    /// Anything else the backend raises
    #[error("backend error: {0}")]
    Backend(String),
}

impl AdapterError {
    pub fn backend(message: impl Into<String>) -> Self {
        AdapterError::Backend(message.into())
    }
}

/// Base contract every adapter capability builds on
#[async_trait]
pub trait AdapterBase: Send + Sync + 'static {
    /// Graceful teardown, called once by the owning process during
    /// shutdown. Behavior of calls made after `disconnect` is
    /// backend-defined: fail fast or no-op.
    async fn disconnect(&self) -> Result<(), AdapterError>;
}

/// Exclusive acquisition of named locks
#[async_trait]
pub trait LockAdapter: AdapterBase {
    /// Acquire the named lock, suspending until it becomes available or
    /// `timeout` elapses. A zero timeout lets the backend wait forever; a
    /// zero ttl means the lock never expires on its own.
    async fn lock(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Release, AdapterError>;

    /// Non-blocking attempt; must not suspend waiting for the lock.
    /// `None` when the lock is currently held elsewhere.
    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<Option<Release>, AdapterError>;

    /// Current global state of the named lock
    async fn is_locked(&self, name: &str) -> Result<bool, AdapterError>;
}

/// Fire-and-forget broadcast
#[async_trait]
pub trait BusAdapter: AdapterBase {
    async fn publish(
        &self,
        channel: &str,
        schema: &MessageSchema,
        payload: Value,
    ) -> Result<(), AdapterError>;

    /// Register a handler; the returned release unsubscribes it
    async fn subscribe(
        &self,
        channel: &str,
        schema: &MessageSchema,
        handler: BusHandler,
    ) -> Result<Release, AdapterError>;
}

/// Work-queue semantics
#[async_trait]
pub trait QueueAdapter: AdapterBase {
    /// Enqueue one message. The backend may hold it back for `delay` before
    /// making it deliverable and may reorder by `priority` (higher first).
    async fn produce(
        &self,
        channel: &str,
        schema: &MessageSchema,
        payload: Value,
        delay: Duration,
        priority: i32,
    ) -> Result<(), AdapterError>;

    /// Deliver messages to `handler` with at most `max_parallel` in flight.
    /// The returned release stops future deliveries; anything already in
    /// flight runs to completion.
    async fn consume(
        &self,
        channel: &str,
        schema: &MessageSchema,
        handler: QueueHandler,
        max_parallel: usize,
    ) -> Result<Release, AdapterError>;
}

/// Simple key/value storage with atomic numeric increment
#[async_trait]
pub trait KeyValueAdapter: AdapterBase {
    async fn get(&self, key: &str) -> Result<Option<Value>, AdapterError>;

    /// A zero ttl means no expiry
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), AdapterError>;

    /// Atomically add `delta`, returning the new value. Missing keys start
    /// at zero.
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, AdapterError>;
}

/// Invalidation-oriented cache propagation
#[async_trait]
pub trait CacheAdapter: AdapterBase {
    /// Announce an invalidation; the transport is backend-defined
    async fn invalidate(&self, message: &CacheInvalidation) -> Result<(), AdapterError>;

    /// Observe invalidation announcements
    async fn on_invalidate(&self, handler: InvalidationHandler) -> Result<Release, AdapterError>;
}

/// The full backend contract: every capability set at once
///
/// Concrete backends typically satisfy all of them, but any primitive can
/// be constructed from an adapter implementing only its matching subset.
pub trait Adapter:
    LockAdapter + BusAdapter + QueueAdapter + KeyValueAdapter + CacheAdapter
{
}

impl<A> Adapter for A where
    A: LockAdapter + BusAdapter + QueueAdapter + KeyValueAdapter + CacheAdapter
{
}
