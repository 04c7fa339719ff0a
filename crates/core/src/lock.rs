// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock primitive: factory and single-owner lock handles
//!
//! Global exclusivity is the adapter's job; a `LockItem` only enforces
//! local single ownership (one acquire per handle until released).

use crate::adapters::{AdapterError, LockAdapter};
use crate::duration::{ParseError, ResolvedTimeOptions, TimeOptions};
use crate::events::{Event, EventBus};
use crate::release::Release;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// TTL applied when an item leaves it unset
pub const DEFAULT_TTL: Duration = Duration::from_millis(120_000);
/// Acquisition timeout applied when an item leaves it unset
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Usage errors from lock handles; backend failures pass through unmodified
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock '{0}' is already acquired by this handle; release it first")]
    AlreadyAcquired(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Stateless factory for lock items bound to one adapter
pub struct Lock<A> {
    adapter: Arc<A>,
    events: EventBus,
}

impl<A: LockAdapter> Lock<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter: Arc::new(adapter),
            events: EventBus::new(),
        }
    }

    /// Attach a shared observability bus; lock activity is published to it
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Resolve `options` once and hand back an unacquired item
    ///
    /// Defaults apply to absent fields only: ttl 120s, timeout 30s. An
    /// explicit zero means "no limit" and survives resolution.
    pub fn item(
        &self,
        id: impl Into<String>,
        options: TimeOptions,
    ) -> Result<LockItem<A>, ParseError> {
        let resolved = options.resolve(ResolvedTimeOptions {
            ttl: DEFAULT_TTL,
            timeout: DEFAULT_TIMEOUT,
        })?;
        Ok(LockItem {
            adapter: Arc::clone(&self.adapter),
            events: self.events.clone(),
            id: id.into(),
            options: resolved,
            releaser: None,
        })
    }
}

impl<A> Clone for Lock<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            events: self.events.clone(),
        }
    }
}

/// Local handle for one named lock
///
/// Invariant: `is_acquired()` exactly when a releaser is stored. Competing
/// handles for the same id may exist in other processes; the adapter
/// arbitrates between them.
pub struct LockItem<A> {
    adapter: Arc<A>,
    events: EventBus,
    id: String,
    options: ResolvedTimeOptions,
    releaser: Option<Release>,
}

impl<A> std::fmt::Debug for LockItem<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockItem")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("acquired", &self.is_acquired())
            .finish()
    }
}

impl<A> LockItem<A> {
    /// Whether this handle currently owns the lock
    pub fn is_acquired(&self) -> bool {
        self.releaser.is_some()
    }
}

impl<A: LockAdapter> LockItem<A> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> ResolvedTimeOptions {
        self.options
    }

    /// Acquire the named lock, suspending until it is granted or the
    /// adapter gives up
    ///
    /// Fails fast with `AlreadyAcquired` when this handle already holds it.
    pub async fn acquire(&mut self) -> Result<&mut Self, LockError> {
        if self.releaser.is_some() {
            return Err(LockError::AlreadyAcquired(self.id.clone()));
        }
        let releaser = self
            .adapter
            .lock(&self.id, self.options.ttl, self.options.timeout)
            .await?;
        self.releaser = Some(releaser);
        tracing::debug!(lock = %self.id, "acquired");
        self.events.publish(Event::LockAcquired {
            name: self.id.clone(),
        });
        Ok(self)
    }

    /// Non-blocking attempt; `Ok(false)` when the lock is held elsewhere
    pub async fn try_acquire(&mut self) -> Result<bool, LockError> {
        if self.releaser.is_some() {
            return Err(LockError::AlreadyAcquired(self.id.clone()));
        }
        match self.adapter.try_lock(&self.id, self.options.ttl).await? {
            Some(releaser) => {
                self.releaser = Some(releaser);
                tracing::debug!(lock = %self.id, "acquired");
                self.events.publish(Event::LockAcquired {
                    name: self.id.clone(),
                });
                Ok(true)
            }
            None => {
                self.events.publish(Event::LockBusy {
                    name: self.id.clone(),
                });
                Ok(false)
            }
        }
    }

    /// Current global lock state, independent of this handle's ownership
    pub async fn is_reserved(&self) -> Result<bool, AdapterError> {
        self.adapter.is_locked(&self.id).await
    }

    /// Release if held; a no-op on an unacquired handle
    pub async fn release(&mut self) -> Result<(), AdapterError> {
        if let Some(releaser) = self.releaser.take() {
            releaser.release().await?;
            tracing::debug!(lock = %self.id, "released");
            self.events.publish(Event::LockReleased {
                name: self.id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
