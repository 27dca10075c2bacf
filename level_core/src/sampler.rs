//! Burst sampler: `n` sequential reads with a settle delay between them,
//! reduced to a truncating integer mean.
//!
//! Read failures are resolved per `ReadPolicy`. A burst either yields an
//! average or an error; the caller skips the cycle on error, so no partial
//! record can be produced.
use std::time::Duration;

use level_traits::AnalogInput;
use level_traits::clock::Clock;
use tracing::{debug, trace, warn};

use crate::config::ReadPolicy;
use crate::error::LevelError;
use crate::hw_error::map_hw_error;
use crate::level::average_truncating;

#[derive(Debug, Clone)]
pub struct BurstSampler {
    samples: u32,
    settle: Duration,
    timeout: Duration,
    policy: ReadPolicy,
    // Most recent successful raw read; only consulted by the stale policy.
    last_good: Option<i32>,
}

impl BurstSampler {
    pub fn new(samples: u32, settle: Duration, timeout: Duration, policy: ReadPolicy) -> Self {
        Self {
            samples: samples.max(1),
            settle,
            timeout,
            policy,
            last_good: None,
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// Take one burst and return its truncating mean.
    ///
    /// Blocks for about `samples * (read latency) + (samples - 1) * settle`.
    pub fn sample_average<A, C>(&mut self, adc: &mut A, clock: &C) -> Result<i32, LevelError>
    where
        A: AnalogInput + ?Sized,
        C: Clock + ?Sized,
    {
        let n = self.samples;
        let mut sum: i64 = 0;
        for i in 0..n {
            let raw = self.read_one(adc)?;
            sum += i64::from(raw);
            if i + 1 < n {
                clock.sleep(self.settle);
            }
        }
        let avg = average_truncating(sum, n);
        trace!(avg, n, "burst averaged");
        Ok(avg)
    }

    fn read_one<A: AnalogInput + ?Sized>(&mut self, adc: &mut A) -> Result<i32, LevelError> {
        match self.policy {
            ReadPolicy::Skip => {
                let raw = adc.read(self.timeout).map_err(|e| map_hw_error(e.as_ref()))?;
                self.last_good = Some(raw);
                Ok(raw)
            }
            ReadPolicy::Retry { max_attempts } => {
                let max_attempts = max_attempts.max(1);
                let mut last = LevelError::Timeout;
                for attempt in 1..=max_attempts {
                    match adc.read(self.timeout) {
                        Ok(raw) => {
                            self.last_good = Some(raw);
                            return Ok(raw);
                        }
                        Err(e) => {
                            last = map_hw_error(e.as_ref());
                            if attempt < max_attempts {
                                warn!(retries = attempt, error = %last, "adc read failed, retrying");
                            }
                        }
                    }
                }
                Err(LevelError::RetriesExhausted {
                    attempts: max_attempts,
                    last: last.to_string(),
                })
            }
            ReadPolicy::Stale => match adc.read(self.timeout) {
                Ok(raw) => {
                    self.last_good = Some(raw);
                    Ok(raw)
                }
                Err(e) => {
                    let mapped = map_hw_error(e.as_ref());
                    match self.last_good {
                        Some(raw) => {
                            debug!(raw, error = %mapped, "adc read failed, reusing last good value");
                            Ok(raw)
                        }
                        None => Err(mapped),
                    }
                }
            },
        }
    }
}
