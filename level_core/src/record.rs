//! The per-cycle output record and its line format.

use std::fmt;
use std::io::Write;

use crate::level::level_from;

/// One completed cycle: `timestamp_us,raw,level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRecord {
    /// Monotonic microseconds since the loop started.
    pub timestamp_us: i64,
    /// Averaged reading for the cycle.
    pub raw: i32,
    /// `max(0, raw - baseline)`.
    pub level: i32,
}

impl CycleRecord {
    pub fn new(timestamp_us: i64, raw: i32, baseline: i32) -> Self {
        Self {
            timestamp_us,
            raw,
            level: level_from(raw, baseline),
        }
    }

    /// Write the record as one newline-terminated line and flush.
    pub fn write_line<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{self}")?;
        out.flush()
    }
}

impl fmt::Display for CycleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.timestamp_us, self.raw, self.level)
    }
}
