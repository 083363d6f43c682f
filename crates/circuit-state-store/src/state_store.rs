use crate::error::Result;
use crate::keys::BucketIndex;
use async_trait::async_trait;

/// Shared circuit breaker state, as seen by the trip-decision logic.
///
/// Implementations must be safe to call concurrently from many processes:
/// bucket increments never lose updates and at most one caller per sleep
/// window is granted a test permit. Store failures are returned as errors,
/// never reported as "closed" or "absent".
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Add one to a bucket, creating it at 1
    async fn increment_bucket(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<()>;

    /// Current bucket value, `None` if the bucket does not exist
    async fn get_bucket(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<Option<u64>>;

    /// Zero an existing bucket and restart its expiry. No-op when absent.
    async fn reset_bucket(&self, command_key: &str, bucket_type: i32, index: &BucketIndex) -> Result<()>;

    /// Mark the circuit open and re-arm its test permit for one sleep window
    async fn open_circuit(&self, command_key: &str, sleeping_window_ms: u64) -> Result<()>;

    /// Mark the circuit closed
    async fn close_circuit(&self, command_key: &str) -> Result<()>;

    async fn is_circuit_open(&self, command_key: &str) -> Result<bool>;

    /// Try to take the single test permit for this sleep window
    async fn allow_single_test(&self, command_key: &str, sleeping_window_ms: u64) -> Result<bool>;
}
