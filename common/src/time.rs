// Time types used across the project.
//
// Post timestamps are nanoseconds so that one author writing quickly
// still produces distinct identities; block header timestamps are
// milliseconds, they only feed the hash preimage and are never compared.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Nanosecond timestamps, used for post identity
pub type TimestampNanos = u64;

// Millisecond timestamps, used in block headers
pub type TimestampMillis = u64;

#[inline]
pub fn get_current_time() -> Duration {
    let start = SystemTime::now();

    start
        .duration_since(UNIX_EPOCH)
        .expect("Incorrect time returned from get_current_time")
}

// Return timestamp in nanoseconds
// Fits in u64 until the year 2554
pub fn get_current_time_in_nanos() -> TimestampNanos {
    get_current_time().as_nanos() as TimestampNanos
}

// Return timestamp in milliseconds
pub fn get_current_time_in_millis() -> TimestampMillis {
    get_current_time().as_millis() as TimestampMillis
}
