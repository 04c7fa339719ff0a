//! Fake adapter implementation for testing
//!
//! Implements every capability set in memory and records each call so unit
//! tests can assert exactly what the primitives asked of the backend. Queue
//! delivery is driven manually with [`FakeAdapter::deliver_next`]; bus
//! publication dispatches immediately.

use super::traits::*;
use crate::cache::CacheInvalidation;
use crate::message::{MessageSchema, QueueMessage};
use crate::release::Release;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Recorded call to an adapter method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    // Lock calls
    Lock {
        name: String,
        ttl: Duration,
        timeout: Duration,
    },
    TryLock {
        name: String,
        ttl: Duration,
    },
    IsLocked {
        name: String,
    },
    Unlock {
        name: String,
    },

    // Bus calls
    Publish {
        channel: String,
        schema: String,
    },
    Subscribe {
        channel: String,
        schema: String,
    },
    Unsubscribe {
        channel: String,
    },

    // Queue calls
    Produce {
        channel: String,
        delay: Duration,
        priority: i32,
    },
    Consume {
        channel: String,
        max_parallel: usize,
    },
    StopConsume {
        channel: String,
    },

    // Key/value calls
    Get {
        key: String,
    },
    Set {
        key: String,
        ttl: Duration,
    },
    Increment {
        key: String,
        delta: i64,
    },

    // Cache calls
    Invalidate {
        key: String,
    },

    Disconnect,
}

/// Shared state behind the fake adapter
#[derive(Default)]
struct FakeState {
    calls: Vec<AdapterCall>,
    locked: HashSet<String>,
    subscribers: HashMap<String, Vec<(u64, BusHandler)>>,
    pending: HashMap<String, Vec<QueueMessage<Value>>>,
    consumers: HashMap<String, QueueHandler>,
    invalidation_handlers: Vec<(u64, InvalidationHandler)>,
    kv: HashMap<String, Value>,
    next_token: u64,
}

impl FakeState {
    fn token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }
}

/// Fake adapter with call recording for testing
#[derive(Clone)]
pub struct FakeAdapter {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// All recorded calls
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.lock_state().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.lock_state().calls.clear();
    }

    /// Mark a lock as held elsewhere so acquisition attempts contend
    pub fn hold_lock(&self, name: &str) {
        self.lock_state().locked.insert(name.to_string());
    }

    /// Seed a key/value entry
    pub fn seed_value(&self, key: &str, value: Value) {
        self.lock_state().kv.insert(key.to_string(), value);
    }

    /// Produced messages waiting for delivery on a channel
    pub fn pending_count(&self, channel: &str) -> usize {
        self.lock_state()
            .pending
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Whether a consumer registration is currently active for a channel
    pub fn has_consumer(&self, channel: &str) -> bool {
        self.lock_state().consumers.contains_key(channel)
    }

    /// Deliver the next pending message to the registered consumer and
    /// return the settled message. `None` when nothing is pending or no
    /// consumer is registered.
    pub async fn deliver_next(&self, channel: &str) -> Option<QueueMessage<Value>> {
        let (handler, message) = {
            let mut state = self.lock_state();
            let handler = Arc::clone(state.consumers.get(channel)?);
            let queue = state.pending.get_mut(channel)?;
            if queue.is_empty() {
                return None;
            }
            let mut message = queue.remove(0);
            message.tries += 1;
            (handler, message)
        };
        Some(handler(message).await)
    }

    fn lock_state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_release(&self, name: &str) -> Release {
        let state = Arc::clone(&self.state);
        let name = name.to_string();
        Release::new(move || async move {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            state.locked.remove(&name);
            state.calls.push(AdapterCall::Unlock { name });
            Ok(())
        })
    }
}

#[async_trait]
impl AdapterBase for FakeAdapter {
    async fn disconnect(&self) -> Result<(), AdapterError> {
        self.lock_state().calls.push(AdapterCall::Disconnect);
        Ok(())
    }
}

#[async_trait]
impl LockAdapter for FakeAdapter {
    async fn lock(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Release, AdapterError> {
        {
            let mut state = self.lock_state();
            state.calls.push(AdapterCall::Lock {
                name: name.to_string(),
                ttl,
                timeout,
            });
            if state.locked.contains(name) {
                // the fake never waits; a contended lock times out at once
                return Err(AdapterError::Timeout {
                    name: name.to_string(),
                    timeout,
                });
            }
            state.locked.insert(name.to_string());
        }
        Ok(self.lock_release(name))
    }

    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<Option<Release>, AdapterError> {
        {
            let mut state = self.lock_state();
            state.calls.push(AdapterCall::TryLock {
                name: name.to_string(),
                ttl,
            });
            if state.locked.contains(name) {
                return Ok(None);
            }
            state.locked.insert(name.to_string());
        }
        Ok(Some(self.lock_release(name)))
    }

    async fn is_locked(&self, name: &str) -> Result<bool, AdapterError> {
        let mut state = self.lock_state();
        state.calls.push(AdapterCall::IsLocked {
            name: name.to_string(),
        });
        Ok(state.locked.contains(name))
    }
}

#[async_trait]
impl BusAdapter for FakeAdapter {
    async fn publish(
        &self,
        channel: &str,
        schema: &MessageSchema,
        payload: Value,
    ) -> Result<(), AdapterError> {
        let handlers: Vec<BusHandler> = {
            let mut state = self.lock_state();
            state.calls.push(AdapterCall::Publish {
                channel: channel.to_string(),
                schema: schema.name.clone(),
            });
            state
                .subscribers
                .get(channel)
                .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(payload.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        schema: &MessageSchema,
        handler: BusHandler,
    ) -> Result<Release, AdapterError> {
        let token = {
            let mut state = self.lock_state();
            state.calls.push(AdapterCall::Subscribe {
                channel: channel.to_string(),
                schema: schema.name.clone(),
            });
            let token = state.token();
            state
                .subscribers
                .entry(channel.to_string())
                .or_default()
                .push((token, handler));
            token
        };

        let state = Arc::clone(&self.state);
        let channel = channel.to_string();
        Ok(Release::new(move || async move {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(subs) = state.subscribers.get_mut(&channel) {
                subs.retain(|(t, _)| *t != token);
            }
            state.calls.push(AdapterCall::Unsubscribe { channel });
            Ok(())
        }))
    }
}

#[async_trait]
impl QueueAdapter for FakeAdapter {
    async fn produce(
        &self,
        channel: &str,
        _schema: &MessageSchema,
        payload: Value,
        delay: Duration,
        priority: i32,
    ) -> Result<(), AdapterError> {
        let mut state = self.lock_state();
        state.calls.push(AdapterCall::Produce {
            channel: channel.to_string(),
            delay,
            priority,
        });
        // the fake delivers in produce order; delay and priority are only
        // recorded
        state
            .pending
            .entry(channel.to_string())
            .or_default()
            .push(QueueMessage::new(channel, payload));
        Ok(())
    }

    async fn consume(
        &self,
        channel: &str,
        _schema: &MessageSchema,
        handler: QueueHandler,
        max_parallel: usize,
    ) -> Result<Release, AdapterError> {
        {
            let mut state = self.lock_state();
            state.calls.push(AdapterCall::Consume {
                channel: channel.to_string(),
                max_parallel,
            });
            state.consumers.insert(channel.to_string(), handler);
        }

        let state = Arc::clone(&self.state);
        let channel = channel.to_string();
        Ok(Release::new(move || async move {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            state.consumers.remove(&channel);
            state.calls.push(AdapterCall::StopConsume { channel });
            Ok(())
        }))
    }
}

#[async_trait]
impl KeyValueAdapter for FakeAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>, AdapterError> {
        let mut state = self.lock_state();
        state.calls.push(AdapterCall::Get {
            key: key.to_string(),
        });
        Ok(state.kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), AdapterError> {
        let mut state = self.lock_state();
        state.calls.push(AdapterCall::Set {
            key: key.to_string(),
            ttl,
        });
        state.kv.insert(key.to_string(), value);
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, AdapterError> {
        let mut state = self.lock_state();
        state.calls.push(AdapterCall::Increment {
            key: key.to_string(),
            delta,
        });
        let current = match state.kv.get(key) {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| AdapterError::backend(format!("key '{key}' is not a number")))?,
            None => 0,
        };
        let next = current + delta;
        state.kv.insert(key.to_string(), Value::from(next));
        Ok(next)
    }
}

#[async_trait]
impl CacheAdapter for FakeAdapter {
    async fn invalidate(&self, message: &CacheInvalidation) -> Result<(), AdapterError> {
        let handlers: Vec<InvalidationHandler> = {
            let mut state = self.lock_state();
            state.calls.push(AdapterCall::Invalidate {
                key: message.key.clone(),
            });
            state.kv.remove(&message.key);
            state
                .invalidation_handlers
                .iter()
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };
        for handler in handlers {
            handler(message.clone()).await;
        }
        Ok(())
    }

    async fn on_invalidate(&self, handler: InvalidationHandler) -> Result<Release, AdapterError> {
        let token = {
            let mut state = self.lock_state();
            let token = state.token();
            state.invalidation_handlers.push((token, handler));
            token
        };

        let state = Arc::clone(&self.state);
        Ok(Release::new(move || async move {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            state.invalidation_handlers.retain(|(t, _)| *t != token);
            Ok(())
        }))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
