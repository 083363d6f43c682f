//! Circuit state over a key-value backend
//!
//! Maps each state operation onto the backend primitive that makes it safe
//! under concurrent callers:
//!
//! | operation           | primitive                         |
//! |---------------------|-----------------------------------|
//! | `increment_bucket`  | `INCR`                            |
//! | `get_bucket`        | `GET`                             |
//! | `reset_bucket`      | `SET 0 XX EX <bucket ttl>`        |
//! | `open_circuit`      | `SET 1` + `SET 1 EX <window>`     |
//! | `close_circuit`     | `SET 0`                           |
//! | `is_circuit_open`   | `GET`                             |
//! | `allow_single_test` | `SET 1 NX EX <window>`            |

use crate::backend::KvBackend;
use crate::config::StoreConfig;
use crate::error::{Result, StateStoreError};
use crate::keys::{BucketIndex, KeyBuilder};
use crate::metrics::{self, OperationTimer};
use crate::state_store::StateStorage;
use crate::window::sleeping_window_secs;
use async_trait::async_trait;
use std::future::Future;
use tracing::{debug, info, warn};

const FLAG_TRUE: &str = "1";
const FLAG_FALSE: &str = "0";

/// Decode a stored circuit flag.
///
/// An empty string is read as `false` so flags written by clients that
/// store booleans as `""`/`"1"` stay readable.
fn decode_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        FLAG_TRUE => Ok(true),
        FLAG_FALSE | "" => Ok(false),
        other => Err(StateStoreError::invalid_value(key, other)),
    }
}

fn decode_count(key: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| StateStoreError::invalid_value(key, value))
}

/// Circuit breaker state held in a shared key-value store
#[derive(Debug, Clone)]
pub struct CircuitStateStore<B> {
    backend: B,
    keys: KeyBuilder,
    bucket_ttl_secs: u64,
}

impl<B: KvBackend> CircuitStateStore<B> {
    /// Create a store with the default key prefix and bucket expiry
    pub fn new(backend: B) -> Self {
        let config = StoreConfig::default();
        metrics::register_metrics();
        Self {
            backend,
            keys: KeyBuilder::default(),
            bucket_ttl_secs: config.bucket_ttl_secs,
        }
    }

    pub fn with_config(backend: B, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let keys = KeyBuilder::new(config.key_prefix)?;
        metrics::register_metrics();
        Ok(Self {
            backend,
            keys,
            bucket_ttl_secs: config.bucket_ttl_secs,
        })
    }

    /// Create a store configured from `CIRCUIT_STATE_*` environment variables
    pub fn from_env(backend: B) -> Result<Self> {
        Self::with_config(backend, StoreConfig::from_env()?)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn bucket_ttl_secs(&self) -> u64 {
        self.bucket_ttl_secs
    }

    /// Store key holding the given bucket
    pub fn bucket_key(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<String> {
        self.keys.bucket_key(command_key, bucket_type, index)
    }

    /// Store key holding the open flag of a circuit
    pub fn circuit_open_key(&self, command_key: &str) -> Result<String> {
        self.keys.circuit_open_key(command_key)
    }

    /// Store key holding the test permit of a circuit
    pub fn circuit_test_key(&self, command_key: &str) -> Result<String> {
        self.keys.circuit_test_key(command_key)
    }

    /// Run one operation with timing, error accounting and logging
    async fn observe<T, F>(&self, operation: &'static str, command_key: &str, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        let backend = self.backend.name();
        let _timer = OperationTimer::new(operation, backend);

        let result = op.await;
        if let Err(e) = &result {
            warn!("{} failed for {} on {}: {}", operation, command_key, backend, e);
            metrics::record_store_error(operation, backend, e.kind());
        }
        result
    }
}

#[async_trait]
impl<B: KvBackend> StateStorage for CircuitStateStore<B> {
    async fn increment_bucket(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<()> {
        self.observe("increment_bucket", command_key, async {
            let key = self.bucket_key(command_key, bucket_type, index)?;
            let value = self.backend.incr(&key).await?;
            debug!("Incremented {} to {}", key, value);
            Ok(())
        })
        .await
    }

    async fn get_bucket(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<Option<u64>> {
        self.observe("get_bucket", command_key, async {
            let key = self.bucket_key(command_key, bucket_type, index)?;
            match self.backend.get(&key).await? {
                Some(value) => decode_count(&key, &value).map(Some),
                None => Ok(None),
            }
        })
        .await
    }

    async fn reset_bucket(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<()> {
        self.observe("reset_bucket", command_key, async {
            let key = self.bucket_key(command_key, bucket_type, index)?;
            let reset = self
                .backend
                .set_xx_ex(&key, "0", self.bucket_ttl_secs)
                .await?;
            if reset {
                debug!("Reset {} (expires in {}s)", key, self.bucket_ttl_secs);
            } else {
                debug!("Reset skipped, {} does not exist", key);
            }
            Ok(())
        })
        .await
    }

    async fn open_circuit(&self, command_key: &str, sleeping_window_ms: u64) -> Result<()> {
        self.observe("open_circuit", command_key, async {
            let open_key = self.circuit_open_key(command_key)?;
            let test_key = self.circuit_test_key(command_key)?;
            let ttl = sleeping_window_secs(sleeping_window_ms);

            self.backend.set(&open_key, FLAG_TRUE).await?;
            self.backend.set_ex(&test_key, FLAG_TRUE, ttl).await?;

            info!("Circuit {} opened, test permit armed for {}s", command_key, ttl);
            metrics::record_transition(true);
            Ok(())
        })
        .await
    }

    async fn close_circuit(&self, command_key: &str) -> Result<()> {
        self.observe("close_circuit", command_key, async {
            let key = self.circuit_open_key(command_key)?;
            self.backend.set(&key, FLAG_FALSE).await?;

            info!("Circuit {} closed", command_key);
            metrics::record_transition(false);
            Ok(())
        })
        .await
    }

    async fn is_circuit_open(&self, command_key: &str) -> Result<bool> {
        self.observe("is_circuit_open", command_key, async {
            let key = self.circuit_open_key(command_key)?;
            match self.backend.get(&key).await? {
                Some(value) => decode_flag(&key, &value),
                None => Ok(false),
            }
        })
        .await
    }

    async fn allow_single_test(&self, command_key: &str, sleeping_window_ms: u64) -> Result<bool> {
        self.observe("allow_single_test", command_key, async {
            let key = self.circuit_test_key(command_key)?;
            let ttl = sleeping_window_secs(sleeping_window_ms);

            let granted = self.backend.set_nx_ex(&key, FLAG_TRUE, ttl).await?;
            if granted {
                info!("Test permit granted for {} ({}s)", command_key, ttl);
            } else {
                debug!("Test permit for {} already taken", command_key);
            }
            metrics::record_test_permit(granted);
            Ok(granted)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_flag() {
        assert!(decode_flag("k", "1").unwrap());
        assert!(!decode_flag("k", "0").unwrap());
        assert!(!decode_flag("k", "").unwrap());

        let err = decode_flag("k", "yes").unwrap_err();
        assert!(matches!(err, StateStoreError::InvalidValue { .. }));
    }

    #[test]
    fn test_decode_count() {
        assert_eq!(decode_count("k", "0").unwrap(), 0);
        assert_eq!(decode_count("k", "42").unwrap(), 42);
        assert!(decode_count("k", "-1").is_err());
        assert!(decode_count("k", "many").is_err());
    }
}
