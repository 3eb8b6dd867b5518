use std::time::{SystemTime, UNIX_EPOCH};

pub mod block;
pub mod envelope;
pub mod transaction;
pub mod user;

/// Nanosecond wall-clock timestamp. Blocks use it as their storage key, so
/// it only needs to be monotonic per proposer between ticks.
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
