//! Key-value primitives the circuit store is built on
//!
//! Every primitive that a concurrent caller depends on for correctness
//! (`incr`, `set_nx_ex`, `set_xx_ex`) must be atomic in the backing store.
//! Implementations never retry: store errors are returned as-is.

use crate::error::Result;
use async_trait::async_trait;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists and never expires
    Persistent,
    /// The key expires in this many seconds
    Expires(u64),
}

#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Short label for logs and metrics
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditional write that clears any expiry
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Unconditional write with an expiry
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Write only if the key is absent. Returns whether the write happened.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool>;

    /// Write only if the key is present. Returns whether the write happened.
    async fn set_xx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool>;

    /// Increment by one, creating the key at 1. Returns the new value.
    async fn incr(&self, key: &str) -> Result<i64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;
}
