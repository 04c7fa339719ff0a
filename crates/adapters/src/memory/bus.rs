// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus capability for the memory adapter
//!
//! Per-channel subscriber lists with sequential in-process dispatch.

use super::MemoryAdapter;
use async_trait::async_trait;
use kelp_core::{AdapterError, BusAdapter, BusHandler, MessageSchema, Release};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
impl BusAdapter for MemoryAdapter {
    async fn publish(
        &self,
        channel: &str,
        _schema: &MessageSchema,
        payload: Value,
    ) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let handlers: Vec<BusHandler> = {
            let subscribers = self
                .state
                .subscribers
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            subscribers
                .get(channel)
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        tracing::trace!(channel, subscribers = handlers.len(), "publishing");
        for handler in handlers {
            handler(payload.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        _schema: &MessageSchema,
        handler: BusHandler,
    ) -> Result<Release, AdapterError> {
        self.ensure_connected()?;
        let token = Uuid::new_v4();
        self.state
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(channel.to_string())
            .or_default()
            .push((token, handler));

        let state = Arc::clone(&self.state);
        let channel = channel.to_string();
        Ok(Release::new(move || async move {
            let mut subscribers = state.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(list) = subscribers.get_mut(&channel) {
                list.retain(|(t, _)| *t != token);
            }
            Ok(())
        }))
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
