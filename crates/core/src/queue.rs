// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue primitive: typed produce/consume channels over a queue-capable
//! adapter
//!
//! Consumption is fault-isolated: a callback error is captured into the
//! message record and never crashes the consumption loop.

use crate::adapters::{BoxFuture, QueueAdapter, QueueHandler};
use crate::duration::{parse, TimeValue};
use crate::message::{ChannelError, Message, MessageSchema, MessageState, QueueMessage};
use crate::release::Release;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Error type consumer callbacks may return; captured into the message
/// record, never propagated
pub type ConsumerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Options for queue producers
#[derive(Clone, Debug, Default)]
pub struct ProduceOptions {
    /// Hold the message back before making it deliverable
    pub delay: Option<TimeValue>,
    /// Higher delivers first; tie-breaking is backend-defined
    pub priority: Option<i32>,
}

impl ProduceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: impl Into<TimeValue>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Options for queue consumers
#[derive(Clone, Debug)]
pub struct ConsumeOptions {
    /// Upper bound on concurrently in-flight callback invocations for one
    /// registration; 1 means strictly sequential
    pub max_parallel: usize,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self { max_parallel: 1 }
    }
}

impl ConsumeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }
}

/// Factory for typed queue channels bound to one adapter
pub struct Queue<A> {
    adapter: Arc<A>,
}

impl<A: QueueAdapter> Queue<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter: Arc::new(adapter),
        }
    }

    /// Derive a named, typed channel
    ///
    /// Name + schema identify the stream; channels created with the same
    /// pair address the same one.
    pub fn channel<T: Message>(&self, name: impl Into<String>) -> QueueChannel<A, T> {
        QueueChannel {
            adapter: Arc::clone(&self.adapter),
            name: name.into(),
            schema: T::schema(),
            _payload: PhantomData,
        }
    }
}

impl<A> Clone for Queue<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
        }
    }
}

/// Named, typed view over one work queue
pub struct QueueChannel<A, T> {
    adapter: Arc<A>,
    name: String,
    schema: MessageSchema,
    _payload: PhantomData<fn() -> T>,
}

impl<A: QueueAdapter, T: Message> QueueChannel<A, T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &MessageSchema {
        &self.schema
    }

    /// Hand one message to the backend, optionally delayed or prioritized
    pub async fn produce(&self, message: &T, options: ProduceOptions) -> Result<(), ChannelError> {
        let delay = Duration::from_millis(parse(options.delay.as_ref())?.unwrap_or(0));
        let priority = options.priority.unwrap_or(0);
        let payload = serde_json::to_value(message)?;
        self.adapter
            .produce(&self.name, &self.schema, payload, delay, priority)
            .await?;
        Ok(())
    }

    /// Register `callback` for deliveries on this channel
    ///
    /// A callback error marks the delivered message failed and records the
    /// cause; the registration stays active for subsequent messages. A
    /// clean return finalizes a still-pending message as done. The returned
    /// release stops future deliveries; in-flight callbacks run to
    /// completion.
    pub async fn consume<F>(
        &self,
        callback: F,
        options: ConsumeOptions,
    ) -> Result<Release, ChannelError>
    where
        F: for<'a> Fn(&'a mut QueueMessage<T>) -> BoxFuture<'a, ConsumerResult>
            + Send
            + Sync
            + 'static,
    {
        let callback = Arc::new(callback);
        let handler: QueueHandler = Arc::new(move |delivered: QueueMessage<Value>| {
            let callback = Arc::clone(&callback);
            Box::pin(run_consumer::<T, F>(delivered, callback))
        });
        let release = self
            .adapter
            .consume(&self.name, &self.schema, handler, options.max_parallel)
            .await?;
        Ok(release)
    }
}

impl<A, T> Clone for QueueChannel<A, T> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            name: self.name.clone(),
            schema: self.schema.clone(),
            _payload: PhantomData,
        }
    }
}

/// Invoke the user callback for one delivery and settle the message
async fn run_consumer<T, F>(delivered: QueueMessage<Value>, callback: Arc<F>) -> QueueMessage<Value>
where
    T: Message,
    F: for<'a> Fn(&'a mut QueueMessage<T>) -> BoxFuture<'a, ConsumerResult> + Send + Sync + 'static,
{
    let mut message: QueueMessage<T> = match delivered.decode() {
        Ok(message) => message,
        Err(error) => {
            tracing::warn!(channel = %delivered.channel, %error, "failed to decode delivery");
            let mut settled = delivered;
            settled.failed(format!("failed to decode payload: {error}"));
            return settled;
        }
    };

    match callback(&mut message).await {
        Ok(()) => {
            // a clean return finalizes a still-pending message
            if message.state == MessageState::Pending {
                message.done();
            }
        }
        Err(error) => {
            tracing::warn!(channel = %message.channel, %error, "consumer callback failed");
            message.failed(error.to_string());
        }
    }

    message.with_payload(delivered.data)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
