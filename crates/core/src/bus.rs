// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pub/sub primitive: typed channels over a bus-capable adapter

use crate::adapters::{BusAdapter, BusHandler};
use crate::message::{ChannelError, Message, MessageSchema};
use crate::release::Release;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Factory for typed pub/sub channels bound to one adapter
pub struct Bus<A> {
    adapter: Arc<A>,
}

impl<A: BusAdapter> Bus<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter: Arc::new(adapter),
        }
    }

    /// Derive a named, typed channel
    ///
    /// Name + schema identify the stream; channels created with the same
    /// pair address the same one.
    pub fn channel<T: Message>(&self, name: impl Into<String>) -> BusChannel<A, T> {
        BusChannel {
            adapter: Arc::clone(&self.adapter),
            name: name.into(),
            schema: T::schema(),
            _payload: PhantomData,
        }
    }
}

impl<A> Clone for Bus<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
        }
    }
}

/// Named, typed view over one broadcast stream
pub struct BusChannel<A, T> {
    adapter: Arc<A>,
    name: String,
    schema: MessageSchema,
    _payload: PhantomData<fn() -> T>,
}

impl<A: BusAdapter, T: Message> BusChannel<A, T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &MessageSchema {
        &self.schema
    }

    /// Forward one message to the adapter
    ///
    /// Delivery guarantees (ordering, at-most/at-least-once) are entirely
    /// adapter-defined; the core promises only "forwarded once per call".
    pub async fn publish(&self, message: &T) -> Result<(), ChannelError> {
        let payload = serde_json::to_value(message)?;
        self.adapter
            .publish(&self.name, &self.schema, payload)
            .await?;
        Ok(())
    }

    /// Register `callback` for messages on this channel
    ///
    /// The returned release unsubscribes; anything already in flight runs
    /// to completion. The core does not buffer, replay, or deduplicate.
    pub async fn subscribe<F, Fut>(&self, callback: F) -> Result<Release, ChannelError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback = Arc::new(callback);
        let channel = self.name.clone();
        let handler: BusHandler = Arc::new(move |payload: Value| {
            let callback = Arc::clone(&callback);
            let channel = channel.clone();
            Box::pin(async move {
                match serde_json::from_value::<T>(payload) {
                    Ok(message) => callback(message).await,
                    Err(error) => {
                        tracing::warn!(channel = %channel, %error, "dropping undecodable message");
                    }
                }
            })
        });
        let release = self
            .adapter
            .subscribe(&self.name, &self.schema, handler)
            .await?;
        Ok(release)
    }
}

impl<A, T> Clone for BusChannel<A, T> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            name: self.name.clone(),
            schema: self.schema.clone(),
            _payload: PhantomData,
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
