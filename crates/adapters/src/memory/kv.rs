// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value and cache capabilities for the memory adapter
//!
//! A TTL-aware map with atomic numeric increment. Invalidation evicts the
//! key and fans the announcement out to registered handlers.

use super::MemoryAdapter;
use async_trait::async_trait;
use kelp_core::{
    AdapterError, CacheAdapter, CacheInvalidation, InvalidationHandler, KeyValueAdapter, Release,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

pub(super) struct KvEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[async_trait]
impl KeyValueAdapter for MemoryAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>, AdapterError> {
        self.ensure_connected()?;
        let mut kv = self.state.kv.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match kv.get(key) {
            Some(entry) if entry.live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                // expired entries are dropped lazily
                kv.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let expires_at = (ttl > Duration::ZERO).then(|| Instant::now() + ttl);
        self.state
            .kv
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), KvEntry { value, expires_at });
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, AdapterError> {
        self.ensure_connected()?;
        let mut kv = self.state.kv.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        // an increment refreshes the value but keeps the entry's expiry
        let (current, expires_at) = match kv.get(key) {
            Some(entry) if entry.live(now) => {
                let current = entry.value.as_i64().ok_or_else(|| {
                    AdapterError::backend(format!("key '{key}' is not a number"))
                })?;
                (current, entry.expires_at)
            }
            _ => (0, None),
        };
        let next = current + delta;
        kv.insert(
            key.to_string(),
            KvEntry {
                value: Value::from(next),
                expires_at,
            },
        );
        Ok(next)
    }
}

#[async_trait]
impl CacheAdapter for MemoryAdapter {
    async fn invalidate(&self, message: &CacheInvalidation) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        self.state
            .kv
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&message.key);

        let handlers: Vec<InvalidationHandler> = {
            let registered = self
                .state
                .invalidation_handlers
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            registered.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        tracing::debug!(key = %message.key, "cache invalidated");
        for handler in handlers {
            handler(message.clone()).await;
        }
        Ok(())
    }

    async fn on_invalidate(&self, handler: InvalidationHandler) -> Result<Release, AdapterError> {
        self.ensure_connected()?;
        let token = Uuid::new_v4();
        self.state
            .invalidation_handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((token, handler));

        let state = Arc::clone(&self.state);
        Ok(Release::new(move || async move {
            state
                .invalidation_handlers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|(t, _)| *t != token);
            Ok(())
        }))
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
