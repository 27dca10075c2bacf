//! Cycle status returned from each loop iteration.

use crate::error::LevelError;
use crate::record::CycleRecord;

/// Public status of a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStatus {
    /// The record was written and flushed.
    Emitted(CycleRecord),
    /// The burst failed; nothing was written for this cycle.
    Skipped(LevelError),
}

/// Where the loop currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    AwaitingPeriod,
    Sampling,
    Emitting,
}
