//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    if let Some(ns) = duration.num_nanoseconds() {
        Some(ns as f64 / NANOS_PER_SECOND as f64)
    } else {
        None
    }
}

/// Get the current unix time as fractional seconds.
///
/// This is the timestamp format used by the telemetry bus.
pub fn unix_time_seconds() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 * 0.001
}
