//! Common time/period helpers for level_core.

use std::time::Duration;

/// Number of microseconds in one millisecond.
pub const MICROS_PER_MILLI: u64 = 1_000;
/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Cycle period for a configured millisecond value.
/// - Clamps `ms` to at least 1 so the schedule always advances.
#[inline]
pub fn period_from_ms(ms: u64) -> Duration {
    debug_assert!(ms > 0, "period_ms must be > 0");
    Duration::from_millis(ms.max(1))
}

/// Cycle period in microseconds for a configured millisecond value.
#[inline]
pub fn period_us(ms: u64) -> u64 {
    ms.max(1).saturating_mul(MICROS_PER_MILLI)
}

/// Microseconds as the signed 64-bit timestamp used in records, saturating at `i64::MAX`.
#[inline]
pub fn us_to_i64(us: u64) -> i64 {
    i64::try_from(us).unwrap_or(i64::MAX)
}

/// Duration to whole microseconds, saturating at `u64::MAX`.
#[inline]
pub fn duration_us(d: Duration) -> u64 {
    d.as_micros().min(u128::from(u64::MAX)) as u64
}
