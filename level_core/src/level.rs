//! Integer arithmetic for the averaged reading and the baseline-relative level.

/// Truncating mean of a burst: `sum / n`, with `n` clamped to at least 1.
///
/// The sum of `n` readings each within `i32` divided by `n` is again within
/// `i32`, so the narrowing is lossless.
#[inline]
pub fn average_truncating(sum: i64, n: u32) -> i32 {
    (sum / i64::from(n.max(1))) as i32
}

/// Level above the rest reading: `max(0, avg - baseline)`, never negative.
#[inline]
pub fn level_from(avg: i32, baseline: i32) -> i32 {
    avg.saturating_sub(baseline).max(0)
}
