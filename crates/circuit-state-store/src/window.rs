//! Sleep window conversion
//!
//! The store expires keys in whole seconds. A millisecond window is rounded
//! up so a permit never expires before the window it guards.

/// Smallest TTL the store accepts
pub const MIN_TTL_SECS: u64 = 1;

/// Convert a sleeping window in milliseconds to a store TTL in seconds.
pub fn sleeping_window_secs(sleeping_window_ms: u64) -> u64 {
    sleeping_window_ms.div_ceil(1000).max(MIN_TTL_SECS)
}
