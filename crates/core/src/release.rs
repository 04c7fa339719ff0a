// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-shot release tokens for acquired resources

use crate::adapters::AdapterError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

type ReleaseFuture = Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send>>;
type ReleaseAction = Box<dyn FnOnce() -> ReleaseFuture + Send>;

/// Relinquishes a previously acquired resource (a lock, a subscription, or
/// a consumer registration)
///
/// The first `release` call runs the underlying action; every later call is
/// a no-op. The guard lives here, on the issuing side, so backends never
/// have to defend against double release.
pub struct Release {
    action: Mutex<Option<ReleaseAction>>,
}

impl Release {
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AdapterError>> + Send + 'static,
    {
        Self {
            action: Mutex::new(Some(Box::new(move || Box::pin(action()) as ReleaseFuture))),
        }
    }

    /// A release with no teardown work
    pub fn noop() -> Self {
        Self::new(|| async { Ok(()) })
    }

    /// Run the release action; safe to call any number of times
    pub async fn release(&self) -> Result<(), AdapterError> {
        let action = self
            .action
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match action {
            Some(run) => run().await,
            None => Ok(()),
        }
    }

    /// Whether the action has already run
    pub fn is_released(&self) -> bool {
        self.action
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

impl std::fmt::Debug for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Release")
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
