//! In-process backend
//!
//! Holds every key in one map behind a single lock, so each primitive is
//! atomic with respect to every other caller sharing the backend. Expiry is
//! evaluated lazily on access against `tokio::time::Instant`, which lets
//! tests pause and advance the clock.
//!
//! Clones share the same map: hand a clone to each `CircuitStateStore` to
//! model several processes talking to one store.

use crate::backend::{KeyTtl, KvBackend};
use crate::error::{Result, StateStoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Key-value primitives held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every key
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the lock cannot leave an entry half-written
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the map with expired entries for `key` already removed
    fn live(&self, key: &str) -> (MutexGuard<'_, HashMap<String, Entry>>, Instant) {
        let now = Instant::now();
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        (entries, now)
    }
}

fn expiry(now: Instant, ttl_secs: u64) -> Option<Instant> {
    Some(now + Duration::from_secs(ttl_secs))
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let (entries, _) = self.live(key);
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (mut entries, _) = self.live(key);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let (mut entries, now) = self.live(key);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: expiry(now, ttl_secs),
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let (mut entries, now) = self.live(key);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: expiry(now, ttl_secs),
            },
        );
        Ok(true)
    }

    async fn set_xx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let (mut entries, now) = self.live(key);
        match entries.get_mut(key) {
            Some(entry) => {
                entry.value = value.to_string();
                entry.expires_at = expiry(now, ttl_secs);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let (mut entries, _) = self.live(key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });

        // Same failure modes as INCR: non-integer value or overflow
        let next = entry
            .value
            .parse::<i64>()
            .ok()
            .and_then(|v| v.checked_add(1))
            .ok_or_else(|| StateStoreError::invalid_value(key, entry.value.clone()))?;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let (entries, _) = self.live(key);
        Ok(entries.contains_key(key))
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let (entries, now) = self.live(key);
        Ok(match entries.get(key) {
            None => KeyTtl::Missing,
            Some(Entry { expires_at: None, .. }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at.saturating_duration_since(now);
                let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                KeyTtl::Expires(secs)
            }
        })
    }
}
