// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter contracts and test doubles

pub mod fake;
pub mod traits;

// Re-export traits
pub use traits::{
    Adapter, AdapterBase, AdapterError, BoxFuture, BusAdapter, BusHandler, CacheAdapter,
    InvalidationHandler, KeyValueAdapter, LockAdapter, QueueAdapter, QueueHandler,
};

// Re-export the fake adapter
pub use fake::{AdapterCall, FakeAdapter};
