// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use async_trait::async_trait;
use kelp_core::{
    AdapterBase, AdapterError, BusAdapter, BusHandler, CacheAdapter, CacheInvalidation,
    InvalidationHandler, KeyValueAdapter, LockAdapter, MessageSchema, QueueAdapter, QueueHandler,
    Release,
};
use serde_json::Value;
use std::time::Duration;

/// Wrapper that adds tracing to any adapter
///
/// Implements each capability trait exactly when the inner adapter does, so
/// a traced adapter can stand in wherever the inner one could.
#[derive(Clone)]
pub struct Traced<A> {
    inner: A,
}

impl<A> Traced<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

#[async_trait]
impl<A: AdapterBase> AdapterBase for Traced<A> {
    async fn disconnect(&self) -> Result<(), AdapterError> {
        let result = self.inner.disconnect().await;
        match &result {
            Ok(()) => tracing::info!("adapter disconnected"),
            Err(e) => tracing::error!(error = %e, "disconnect failed"),
        }
        result
    }
}

#[async_trait]
impl<A: LockAdapter> LockAdapter for Traced<A> {
    async fn lock(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Release, AdapterError> {
        let span = tracing::info_span!("lock.acquire", name);
        let _guard = span.enter();

        tracing::debug!(?ttl, ?timeout, "acquiring");

        let start = std::time::Instant::now();
        let result = self.inner.lock(name, ttl, timeout).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "acquired"),
            Err(e) => tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "acquisition failed"
            ),
        }
        result
    }

    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<Option<Release>, AdapterError> {
        let result = self.inner.try_lock(name, ttl).await;
        match &result {
            Ok(Some(_)) => tracing::debug!(name, "acquired"),
            Ok(None) => tracing::debug!(name, "busy"),
            Err(e) => tracing::warn!(name, error = %e, "try_lock failed"),
        }
        result
    }

    async fn is_locked(&self, name: &str) -> Result<bool, AdapterError> {
        let result = self.inner.is_locked(name).await;
        tracing::trace!(name, locked = ?result.as_ref().ok(), "checked");
        result
    }
}

#[async_trait]
impl<A: BusAdapter> BusAdapter for Traced<A> {
    async fn publish(
        &self,
        channel: &str,
        schema: &MessageSchema,
        payload: Value,
    ) -> Result<(), AdapterError> {
        let result = self.inner.publish(channel, schema, payload).await;
        match &result {
            Ok(()) => tracing::debug!(channel, schema = %schema, "published"),
            Err(e) => tracing::warn!(channel, error = %e, "publish failed"),
        }
        result
    }

    async fn subscribe(
        &self,
        channel: &str,
        schema: &MessageSchema,
        handler: BusHandler,
    ) -> Result<Release, AdapterError> {
        let result = self.inner.subscribe(channel, schema, handler).await;
        match &result {
            Ok(_) => tracing::info!(channel, schema = %schema, "subscribed"),
            Err(e) => tracing::warn!(channel, error = %e, "subscribe failed"),
        }
        result
    }
}

#[async_trait]
impl<A: QueueAdapter> QueueAdapter for Traced<A> {
    async fn produce(
        &self,
        channel: &str,
        schema: &MessageSchema,
        payload: Value,
        delay: Duration,
        priority: i32,
    ) -> Result<(), AdapterError> {
        let result = self
            .inner
            .produce(channel, schema, payload, delay, priority)
            .await;
        match &result {
            Ok(()) => tracing::debug!(channel, ?delay, priority, "produced"),
            Err(e) => tracing::warn!(channel, error = %e, "produce failed"),
        }
        result
    }

    async fn consume(
        &self,
        channel: &str,
        schema: &MessageSchema,
        handler: QueueHandler,
        max_parallel: usize,
    ) -> Result<Release, AdapterError> {
        let result = self
            .inner
            .consume(channel, schema, handler, max_parallel)
            .await;
        match &result {
            Ok(_) => tracing::info!(channel, max_parallel, "consumer registered"),
            Err(e) => tracing::warn!(channel, error = %e, "consume failed"),
        }
        result
    }
}

#[async_trait]
impl<A: KeyValueAdapter> KeyValueAdapter for Traced<A> {
    async fn get(&self, key: &str) -> Result<Option<Value>, AdapterError> {
        let result = self.inner.get(key).await;
        tracing::trace!(key, hit = ?result.as_ref().map(Option::is_some).ok(), "get");
        result
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), AdapterError> {
        let result = self.inner.set(key, value, ttl).await;
        tracing::trace!(key, ?ttl, ok = result.is_ok(), "set");
        result
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, AdapterError> {
        let result = self.inner.increment(key, delta).await;
        match &result {
            Ok(value) => tracing::debug!(key, delta, value, "incremented"),
            Err(e) => tracing::warn!(key, error = %e, "increment failed"),
        }
        result
    }
}

#[async_trait]
impl<A: CacheAdapter> CacheAdapter for Traced<A> {
    async fn invalidate(&self, message: &CacheInvalidation) -> Result<(), AdapterError> {
        let result = self.inner.invalidate(message).await;
        match &result {
            Ok(()) => tracing::debug!(key = %message.key, "invalidated"),
            Err(e) => tracing::warn!(key = %message.key, error = %e, "invalidate failed"),
        }
        result
    }

    async fn on_invalidate(&self, handler: InvalidationHandler) -> Result<Release, AdapterError> {
        let result = self.inner.on_invalidate(handler).await;
        match &result {
            Ok(_) => tracing::info!("invalidation handler registered"),
            Err(e) => tracing::warn!(error = %e, "on_invalidate failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
