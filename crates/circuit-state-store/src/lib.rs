//! Circuit State Store - Shared Circuit Breaker State
//!
//! Keeps the runtime state of a circuit breaker in an external key-value
//! store so every process protecting the same command sees the same state:
//! - Rolling-window bucket counters (atomic increment, expiring reset)
//! - Circuit open flag per command
//! - Single-use half-open test permit per sleep window
//!
//! Features:
//! - Redis backend over a caller-owned async connection
//! - In-memory backend for tests and single-process use
//! - Prometheus metrics
//! - Tracing logs for every state transition
//!
//! ```ignore
//! use circuit_state_store::prelude::*;
//!
//! let conn = redis::aio::ConnectionManager::new(client).await?;
//! let store = CircuitStateStore::new(RedisBackend::new(conn));
//!
//! store.increment_bucket("payments", 1, &BucketIndex::Int(slot)).await?;
//! if !store.is_circuit_open("payments").await? {
//!     // run the command
//! }
//! ```

pub mod backend;
pub mod circuit_store;
pub mod config;
pub mod error;
pub mod keys;
pub mod memory_backend;
pub mod metrics;
pub mod redis_backend;
pub mod state_store;
pub mod window;

pub use backend::{KeyTtl, KvBackend};
pub use circuit_store::CircuitStateStore;
pub use config::StoreConfig;
pub use error::{Result, StateStoreError};
pub use keys::{BucketIndex, KeyBuilder};
pub use memory_backend::InMemoryBackend;
pub use redis_backend::RedisBackend;
pub use state_store::StateStorage;
pub use window::sleeping_window_secs;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::backend::{KeyTtl, KvBackend};
    pub use super::circuit_store::CircuitStateStore;
    pub use super::keys::BucketIndex;
    pub use super::memory_backend::InMemoryBackend;
    pub use super::redis_backend::RedisBackend;
    pub use super::state_store::StateStorage;
}
