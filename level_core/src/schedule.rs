//! Absolute (drift-free) periodic scheduling.
//!
//! Each deadline is the previous deadline plus the period, never "now plus
//! period", so work time inside a cycle does not accumulate as drift. When a
//! cycle overruns its slot the wait is zero and the schedule re-anchors at
//! the current instant: the next cycle starts immediately, exactly once, and
//! no burst of back-to-back cycles follows.
use std::time::{Duration, Instant};

use level_traits::clock::Clock;

/// Outcome of waiting for the next period boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Slept until the boundary; `waited` is the time spent asleep.
    OnTime { waited: Duration },
    /// The boundary had already passed by `late_by`; no sleep happened.
    Overrun { late_by: Duration },
}

#[derive(Debug, Clone)]
pub struct AbsoluteSchedule {
    period: Duration,
    last_wake: Instant,
    overruns: u64,
}

impl AbsoluteSchedule {
    pub fn new(anchor: Instant, period: Duration) -> Self {
        Self {
            period,
            last_wake: anchor,
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Boundary the next `wait_next` will target.
    pub fn next_deadline(&self) -> Instant {
        self.last_wake + self.period
    }

    /// Number of cycles whose work ran past their boundary.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Reset the anchor, e.g. when a loop (re)starts.
    pub fn reanchor(&mut self, anchor: Instant) {
        self.last_wake = anchor;
    }

    /// Block until the next period boundary.
    pub fn wait_next<C: Clock + ?Sized>(&mut self, clock: &C) -> Wake {
        let deadline = self.next_deadline();
        let now = clock.now();
        if now <= deadline {
            clock.sleep_until(deadline);
            self.last_wake = deadline;
            Wake::OnTime {
                waited: deadline - now,
            }
        } else {
            self.overruns = self.overruns.saturating_add(1);
            self.last_wake = now;
            Wake::Overrun {
                late_by: now - deadline,
            }
        }
    }
}
