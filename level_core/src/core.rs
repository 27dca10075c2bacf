//! The sampling loop: one owned converter, one burst sampler, one absolute schedule.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use level_traits::AnalogInput;
use level_traits::clock::Clock;

use crate::error::{LevelError, Report, Result};
use crate::record::CycleRecord;
use crate::sampler::BurstSampler;
use crate::schedule::{AbsoluteSchedule, Wake};
use crate::stats::RunStats;
use crate::status::{CycleState, CycleStatus};
use crate::util::{duration_us, us_to_i64};

pub struct LevelLoop {
    pub(crate) adc: Box<dyn AnalogInput>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) sampler: BurstSampler,
    pub(crate) baseline: i32,
    pub(crate) max_consecutive_skips: u32,
    pub(crate) consecutive_skips: u32,
    // Timestamps are microseconds since this instant
    pub(crate) epoch: Instant,
    pub(crate) schedule: AbsoluteSchedule,
    pub(crate) state: CycleState,
    pub(crate) stats: RunStats,
}

impl fmt::Debug for LevelLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelLoop")
            .field("period", &self.schedule.period())
            .field("samples", &self.sampler.samples())
            .field("baseline", &self.baseline)
            .field("state", &self.state)
            .finish()
    }
}

impl LevelLoop {
    pub fn baseline(&self) -> i32 {
        self.baseline
    }

    pub fn period(&self) -> Duration {
        self.schedule.period()
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Reset per-run state and anchor the schedule at the current instant.
    pub fn begin(&mut self) {
        self.epoch = self.clock.now();
        self.schedule.reanchor(self.epoch);
        self.consecutive_skips = 0;
        self.stats = RunStats::default();
        self.state = CycleState::AwaitingPeriod;
    }

    /// One full cycle: timestamp, burst, emit (or skip), then wait for the next boundary.
    ///
    /// A write failure on `out` is returned as an error; a failed burst is not.
    pub fn step<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<CycleStatus> {
        self.state = CycleState::Sampling;
        let started = self.clock.now();
        let timestamp_us = us_to_i64(self.clock.us_since(self.epoch));
        self.stats.cycles += 1;

        let burst = self
            .sampler
            .sample_average(self.adc.as_mut(), self.clock.as_ref());
        let status = match burst {
            Ok(avg) => {
                self.state = CycleState::Emitting;
                let rec = CycleRecord::new(timestamp_us, avg, self.baseline);
                rec.write_line(out)
                    .map_err(|e| Report::new(LevelError::from(e)))?;
                self.consecutive_skips = 0;
                self.stats.emitted += 1;
                tracing::debug!(timestamp_us, raw = rec.raw, level = rec.level, "cycle emitted");
                CycleStatus::Emitted(rec)
            }
            Err(e) => {
                self.consecutive_skips = self.consecutive_skips.saturating_add(1);
                self.stats.skipped += 1;
                tracing::warn!(
                    error = %e,
                    consecutive = self.consecutive_skips,
                    "cycle skipped"
                );
                if self.max_consecutive_skips > 0
                    && self.consecutive_skips >= self.max_consecutive_skips
                {
                    return Err(Report::new(LevelError::ReadFailures {
                        consecutive: self.consecutive_skips,
                    }));
                }
                CycleStatus::Skipped(e)
            }
        };

        let work = self.clock.now().saturating_duration_since(started);
        self.stats.record_work(duration_us(work));

        self.state = CycleState::AwaitingPeriod;
        if let Wake::Overrun { late_by } = self.schedule.wait_next(self.clock.as_ref()) {
            self.stats.overruns += 1;
            tracing::debug!(late_us = duration_us(late_by), "cycle overran its period");
        }
        Ok(status)
    }

    /// Run cycles until `shutdown` is set, `max_cycles` have been attempted,
    /// or the output is closed. The stop flag is checked once per cycle boundary.
    pub fn run<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        shutdown: &AtomicBool,
        max_cycles: Option<u64>,
    ) -> Result<RunStats> {
        tracing::info!(
            period_ms = self.schedule.period().as_millis() as u64,
            samples = self.sampler.samples(),
            baseline = self.baseline,
            policy = ?self.sampler.policy(),
            "sampling loop start"
        );
        self.begin();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("stop requested");
                break;
            }
            if let Some(max) = max_cycles {
                if self.stats.cycles >= max {
                    break;
                }
            }
            if let Err(e) = self.step(out) {
                if matches!(e.downcast_ref::<LevelError>(), Some(LevelError::OutputClosed)) {
                    tracing::info!("output closed, stopping");
                    break;
                }
                tracing::error!(error = %e, "sampling loop aborted");
                return Err(e);
            }
        }

        tracing::info!(
            cycles = self.stats.cycles,
            emitted = self.stats.emitted,
            skipped = self.stats.skipped,
            overruns = self.stats.overruns,
            "sampling loop stop"
        );
        Ok(self.stats.clone())
    }
}
