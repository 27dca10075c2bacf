//! Configuration types for the sampling loop.
//!
//! These are the runtime configuration structs used by `LevelLoop`.
//! They are separate from the TOML-deserialized config in `level_config`.

/// Sampling and scheduling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingCfg {
    /// Cycle period in milliseconds.
    pub period_ms: u64,
    /// Raw reads averaged per cycle (>= 1).
    pub samples_avg: u32,
    /// Delay between consecutive raw reads in microseconds.
    pub settle_us: u64,
    /// Rest reading subtracted from the average to form the level.
    pub baseline: i32,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            period_ms: 10,
            samples_avg: 16,
            settle_us: 80,
            baseline: 1530,
        }
    }
}

/// What to do when a single raw read fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// Abandon the burst and skip the cycle.
    #[default]
    Skip,
    /// Try each read up to `max_attempts` times in total, then skip the cycle.
    Retry { max_attempts: u32 },
    /// Substitute the last good raw value; skip only if there has never been one.
    Stale,
}

/// Per-read bounds and the skip watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCfg {
    pub policy: ReadPolicy,
    /// Timeout handed to every `AnalogInput::read` call (ms).
    pub timeout_ms: u64,
    /// Abort the loop after this many skipped cycles in a row. 0 disables.
    pub max_consecutive_skips: u32,
}

impl Default for ReadCfg {
    fn default() -> Self {
        Self {
            policy: ReadPolicy::Skip,
            timeout_ms: 5,
            max_consecutive_skips: 0,
        }
    }
}
