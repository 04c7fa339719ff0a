// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kelp-core: client-side coordination primitives over pluggable backends
//!
//! This crate provides:
//! - Typed primitives for locks, pub/sub channels, and work queues
//! - Capability traits a backend adapter may implement in any subset
//! - Duration normalization for TTL/timeout options
//! - An event bus for observability around lock activity

pub mod adapters;
pub mod events;

pub mod cache;
pub mod duration;
pub mod message;
pub mod release;

// Primitives (order matters for dependencies)
pub mod lock;
pub mod bus;
pub mod queue;

// Re-exports
pub use cache::CacheInvalidation;
pub use duration::{parse, ParseError, ResolvedTimeOptions, TimeOptions, TimeValue};
pub use message::{ChannelError, Message, MessageSchema, MessageState, QueueMessage};
pub use release::Release;

pub use bus::{Bus, BusChannel};
pub use lock::{Lock, LockError, LockItem};
pub use queue::{ConsumeOptions, ConsumerResult, ProduceOptions, Queue, QueueChannel};

// Re-export adapter contracts
pub use adapters::{
    Adapter, AdapterBase, AdapterError, BoxFuture, BusAdapter, BusHandler, CacheAdapter,
    FakeAdapter, InvalidationHandler, KeyValueAdapter, LockAdapter, QueueAdapter, QueueHandler,
};

// Re-export events
pub use events::{Event, EventBus, EventPattern, EventReceiver, SubscriberId, Subscription};
