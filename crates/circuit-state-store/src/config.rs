//! Store configuration
//!
//! Read from the environment so every process protecting the same command
//! agrees on the key namespace:
//!
//! - `CIRCUIT_STATE_KEY_PREFIX` (default `phystrix`)
//! - `CIRCUIT_STATE_BUCKET_TTL_SECS` (default `120`)

use crate::error::{Result, StateStoreError};
use crate::keys::{validate_segment, DEFAULT_KEY_PREFIX};
use serde::Deserialize;
use tracing::debug;

/// Lifetime given to a bucket when it is reset
pub const BUCKET_EXPIRE_SECONDS: u64 = 120;

pub const ENV_KEY_PREFIX: &str = "CIRCUIT_STATE_KEY_PREFIX";
pub const ENV_BUCKET_TTL: &str = "CIRCUIT_STATE_BUCKET_TTL_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Namespace tag prepended to every key
    pub key_prefix: String,
    /// Expiry applied by `reset_bucket`
    pub bucket_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            bucket_ttl_secs: BUCKET_EXPIRE_SECONDS,
        }
    }
}

impl StoreConfig {
    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prefix) = lookup(ENV_KEY_PREFIX) {
            debug!("Loaded: {}={}", ENV_KEY_PREFIX, prefix);
            config.key_prefix = prefix.trim().to_string();
        }

        if let Some(ttl) = lookup(ENV_BUCKET_TTL) {
            debug!("Loaded: {}={}", ENV_BUCKET_TTL, ttl);
            config.bucket_ttl_secs = ttl.trim().parse().map_err(|_| {
                StateStoreError::Config(format!("{} must be a positive integer, got {:?}", ENV_BUCKET_TTL, ttl))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_segment("key prefix", &self.key_prefix)
            .map_err(|e| StateStoreError::Config(e.to_string()))?;
        if self.bucket_ttl_secs == 0 {
            return Err(StateStoreError::Config(format!(
                "{} must be greater than zero",
                ENV_BUCKET_TTL
            )));
        }
        Ok(())
    }
}
