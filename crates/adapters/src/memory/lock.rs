// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock capability for the memory adapter
//!
//! Named entries with an owner token and optional TTL expiry. Waiters park
//! on a shared `Notify` and re-attempt whenever a lock is freed or the
//! current holder's TTL runs out.

use super::MemoryAdapter;
use async_trait::async_trait;
use kelp_core::{AdapterError, LockAdapter, Release};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

pub(super) struct LockEntry {
    owner: Uuid,
    expires_at: Option<Instant>,
}

impl LockEntry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl MemoryAdapter {
    /// Single check-and-set attempt. On contention returns the current
    /// holder's expiry so callers know when re-attempting could succeed.
    fn grab(&self, name: &str, ttl: Duration) -> Result<Release, Option<Instant>> {
        let mut locks = self.state.locks.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match locks.get(name) {
            Some(entry) if !entry.expired(now) => Err(entry.expires_at),
            _ => {
                let owner = Uuid::new_v4();
                let expires_at = (ttl > Duration::ZERO).then(|| now + ttl);
                locks.insert(name.to_string(), LockEntry { owner, expires_at });
                Ok(self.lock_release(name, owner))
            }
        }
    }

    fn lock_release(&self, name: &str, owner: Uuid) -> Release {
        let state = Arc::clone(&self.state);
        let name = name.to_string();
        Release::new(move || async move {
            {
                let mut locks = state.locks.lock().unwrap_or_else(|e| e.into_inner());
                // only the owner may free it; an expired lock may have been
                // re-taken by another holder
                if locks.get(&name).is_some_and(|entry| entry.owner == owner) {
                    locks.remove(&name);
                }
            }
            state.lock_freed.notify_waiters();
            Ok(())
        })
    }
}

#[async_trait]
impl LockAdapter for MemoryAdapter {
    async fn lock(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Release, AdapterError> {
        self.ensure_connected()?;
        let deadline = (timeout > Duration::ZERO).then(|| Instant::now() + timeout);

        loop {
            // register for wakeups before attempting, so a release between
            // the attempt and the wait is not lost
            let notified = self.state.lock_freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let holder_expiry = match self.grab(name, ttl) {
                Ok(release) => return Ok(release),
                Err(expiry) => expiry,
            };

            let now = Instant::now();
            if let Some(deadline) = deadline {
                if now >= deadline {
                    return Err(AdapterError::Timeout {
                        name: name.to_string(),
                        timeout,
                    });
                }
            }

            let wait_until = match (deadline, holder_expiry) {
                (Some(deadline), Some(expiry)) => Some(deadline.min(expiry)),
                (Some(deadline), None) => Some(deadline),
                (None, Some(expiry)) => Some(expiry),
                (None, None) => None,
            };
            match wait_until {
                Some(until) => {
                    let _ = tokio::time::timeout_at(until, notified).await;
                }
                None => notified.await,
            }
            self.ensure_connected()?;
        }
    }

    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<Option<Release>, AdapterError> {
        self.ensure_connected()?;
        Ok(self.grab(name, ttl).ok())
    }

    async fn is_locked(&self, name: &str) -> Result<bool, AdapterError> {
        self.ensure_connected()?;
        let locks = self.state.locks.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        Ok(locks.get(name).is_some_and(|entry| !entry.expired(now)))
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
