// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed message contracts shared by the bus and queue primitives

use crate::adapters::AdapterError;
use crate::duration::ParseError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Resolved description of a payload shape
///
/// Threaded through to adapters unmodified; the core never interprets
/// payload contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSchema {
    pub name: String,
}

impl MessageSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for MessageSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Payload contract for typed channels
///
/// Channel name + schema identify a logical stream; channel objects created
/// with the same pair address the same stream.
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable schema describing this payload shape
    fn schema() -> MessageSchema;
}

/// Life-cycle state of a queue message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Pending,
    Done,
    Failed,
}

/// A message delivered to a queue consumer
///
/// Created by the adapter at delivery time and settled by the consumer,
/// directly or through the channel wrapper capturing a callback error.
/// `tries` and `delayed` are advisory fields a backend may use for
/// retry/backoff; the core only records intent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueMessage<T> {
    pub channel: String,
    pub data: T,
    pub state: MessageState,
    pub error: Option<String>,
    pub tries: u32,
    #[serde(with = "humantime_serde")]
    pub delayed: Duration,
}

impl<T> QueueMessage<T> {
    pub fn new(channel: impl Into<String>, data: T) -> Self {
        Self {
            channel: channel.into(),
            data,
            state: MessageState::Pending,
            error: None,
            tries: 0,
            delayed: Duration::ZERO,
        }
    }

    /// Mark this message successfully handled
    pub fn done(&mut self) {
        self.state = MessageState::Done;
    }

    /// Mark this message failed, recording the cause
    pub fn failed(&mut self, error: impl Into<String>) {
        self.state = MessageState::Failed;
        self.error = Some(error.into());
    }

    /// Advisory redelivery hint; leaves `state` untouched
    pub fn delay(&mut self, delay: Duration) {
        self.delayed = delay;
    }

    pub fn is_failed(&self) -> bool {
        self.state == MessageState::Failed
    }

    pub fn is_done(&self) -> bool {
        self.state == MessageState::Done
    }

    /// Rebuild the wire form, carrying this message's bookkeeping over the
    /// given payload
    pub fn with_payload(&self, payload: Value) -> QueueMessage<Value> {
        QueueMessage {
            channel: self.channel.clone(),
            data: payload,
            state: self.state,
            error: self.error.clone(),
            tries: self.tries,
            delayed: self.delayed,
        }
    }
}

impl QueueMessage<Value> {
    /// Decode the payload into a typed message, keeping the bookkeeping
    pub fn decode<T: DeserializeOwned>(&self) -> Result<QueueMessage<T>, serde_json::Error> {
        Ok(QueueMessage {
            channel: self.channel.clone(),
            data: serde_json::from_value(self.data.clone())?,
            state: self.state,
            error: self.error.clone(),
            tries: self.tries,
            delayed: self.delayed,
        })
    }
}

/// Errors from typed channel operations
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
