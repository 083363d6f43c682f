//! Store key construction
//!
//! Every piece of circuit state is a single named key. Keys are built from a
//! namespace tag plus `:`-delimited segments:
//!
//! - `{prefix}_bucket:{command}:{type}:{index}`
//! - `{prefix}_circuit_open:{command}`
//! - `{prefix}_circuit_test:{command}`
//!
//! Free-form segments (command keys, string indices, the prefix) are
//! validated so that no two distinct inputs can produce the same key.

use crate::error::{Result, StateStoreError};
use std::fmt;

/// Default key namespace
pub const DEFAULT_KEY_PREFIX: &str = "phystrix";

/// Separator between key segments
pub const KEY_DELIMITER: char = ':';

/// Upper bound on a single free-form key segment, in bytes
pub const MAX_SEGMENT_LEN: usize = 512;

/// Position of a bucket in the rolling statistics window.
///
/// Callers use either a numeric slot (usually derived from a timestamp) or
/// an opaque string. `Int(5)` and `Str("5")` name the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketIndex {
    Int(i64),
    Str(String),
}

impl fmt::Display for BucketIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketIndex::Int(i) => write!(f, "{}", i),
            BucketIndex::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for BucketIndex {
    fn from(value: i64) -> Self {
        BucketIndex::Int(value)
    }
}

impl From<i32> for BucketIndex {
    fn from(value: i32) -> Self {
        BucketIndex::Int(value as i64)
    }
}

impl From<u32> for BucketIndex {
    fn from(value: u32) -> Self {
        BucketIndex::Int(value as i64)
    }
}

impl From<&str> for BucketIndex {
    fn from(value: &str) -> Self {
        BucketIndex::Str(value.to_string())
    }
}

impl From<String> for BucketIndex {
    fn from(value: String) -> Self {
        BucketIndex::Str(value)
    }
}

impl TryFrom<u64> for BucketIndex {
    type Error = StateStoreError;

    fn try_from(value: u64) -> Result<Self> {
        i64::try_from(value)
            .map(BucketIndex::Int)
            .map_err(|_| StateStoreError::invalid_argument(format!("bucket index {} out of range", value)))
    }
}

/// Check that a free-form segment cannot break key uniqueness.
pub fn validate_segment(what: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(StateStoreError::invalid_argument(format!("{} must not be empty", what)));
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(StateStoreError::invalid_argument(format!(
            "{} exceeds {} bytes",
            what, MAX_SEGMENT_LEN
        )));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| *c == KEY_DELIMITER || c.is_whitespace() || c.is_control())
    {
        return Err(StateStoreError::invalid_argument(format!(
            "{} {:?} contains forbidden character {:?}",
            what, segment, c
        )));
    }
    Ok(())
}

/// Builds the store keys for one namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_segment("key prefix", &prefix)?;
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn bucket_key(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<String> {
        validate_segment("command key", command_key)?;
        if let BucketIndex::Str(s) = index {
            validate_segment("bucket index", s)?;
        }
        Ok(format!(
            "{}_bucket:{}:{}:{}",
            self.prefix, command_key, bucket_type, index
        ))
    }

    pub fn circuit_open_key(&self, command_key: &str) -> Result<String> {
        validate_segment("command key", command_key)?;
        Ok(format!("{}_circuit_open:{}", self.prefix, command_key))
    }

    pub fn circuit_test_key(&self, command_key: &str) -> Result<String> {
        validate_segment("command key", command_key)?;
        Ok(format!("{}_circuit_test:{}", self.prefix, command_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        let keys = KeyBuilder::default();

        assert_eq!(
            keys.bucket_key("payments", 2, &BucketIndex::Int(1700000000)).unwrap(),
            "phystrix_bucket:payments:2:1700000000"
        );
        assert_eq!(
            keys.circuit_open_key("payments").unwrap(),
            "phystrix_circuit_open:payments"
        );
        assert_eq!(
            keys.circuit_test_key("payments").unwrap(),
            "phystrix_circuit_test:payments"
        );
    }

    #[test]
    fn test_custom_prefix() {
        let keys = KeyBuilder::new("svc-a").unwrap();
        assert_eq!(keys.prefix(), "svc-a");
        assert_eq!(
            keys.circuit_open_key("cmd").unwrap(),
            "svc-a_circuit_open:cmd"
        );

        assert!(KeyBuilder::new("bad:prefix").is_err());
        assert!(KeyBuilder::new("").is_err());
    }

    #[test]
    fn test_delimiter_in_command_key_rejected() {
        let keys = KeyBuilder::default();

        let err = keys.circuit_open_key("a:b").unwrap_err();
        assert!(matches!(err, StateStoreError::InvalidArgument(_)));
        assert!(keys.bucket_key("a:1", 2, &"x".into()).is_err());
        assert!(keys.bucket_key("a", 1, &"2:x".into()).is_err());
    }

    #[test]
    fn test_whitespace_and_empty_rejected() {
        let keys = KeyBuilder::default();

        assert!(keys.circuit_test_key("").is_err());
        assert!(keys.circuit_test_key("has space").is_err());
        assert!(keys.circuit_test_key("tab\there").is_err());
        assert!(keys.bucket_key("cmd", 0, &"".into()).is_err());
        assert!(keys.circuit_test_key(&"x".repeat(MAX_SEGMENT_LEN + 1)).is_err());
        assert!(keys.circuit_test_key(&"x".repeat(MAX_SEGMENT_LEN)).is_ok());
    }

    #[test]
    fn test_underscores_do_not_collide() {
        // "a_1" + type 2 must not alias "a" + type 1 + index "2_x"
        let keys = KeyBuilder::default();
        let first = keys.bucket_key("a_1", 2, &"x".into()).unwrap();
        let second = keys.bucket_key("a", 1, &"2_x".into()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_entity_kinds_do_not_collide() {
        let keys = KeyBuilder::default();
        let open = keys.circuit_open_key("cmd").unwrap();
        let test = keys.circuit_test_key("cmd").unwrap();
        let bucket = keys.bucket_key("cmd", 0, &0i64.into()).unwrap();
        assert_ne!(open, test);
        assert_ne!(open, bucket);
        assert_ne!(test, bucket);
    }

    #[test]
    fn test_int_and_str_index_share_slot() {
        let keys = KeyBuilder::default();
        assert_eq!(
            keys.bucket_key("cmd", 1, &BucketIndex::Int(5)).unwrap(),
            keys.bucket_key("cmd", 1, &BucketIndex::from("5")).unwrap()
        );
        assert_eq!(
            keys.bucket_key("cmd", 1, &BucketIndex::Int(-3)).unwrap(),
            "phystrix_bucket:cmd:1:-3"
        );
    }

    #[test]
    fn test_u64_index_conversion() {
        assert_eq!(BucketIndex::try_from(42u64).unwrap(), BucketIndex::Int(42));
        assert!(BucketIndex::try_from(u64::MAX).is_err());
    }
}
