//! Type-state builder for `LevelLoop` and the generic `build_loop` constructor.
//!
//! The builder enforces at compile time that an analog input is provided
//! before `build()` is available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use level_traits::AnalogInput;
use level_traits::clock::{Clock, MonotonicClock};

use crate::config::{ReadCfg, ReadPolicy, SamplingCfg};
use crate::core::LevelLoop;
use crate::error::{BuildError, Result};
use crate::sampler::BurstSampler;
use crate::schedule::AbsoluteSchedule;
use crate::stats::RunStats;
use crate::status::CycleState;
use crate::util::{MICROS_PER_MILLI, period_from_ms};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `LevelLoop`. All fields are validated on `build()`.
pub struct LevelLoopBuilder<A> {
    adc: Option<Box<dyn AnalogInput>>,
    sampling: Option<SamplingCfg>,
    read: Option<ReadCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _a: PhantomData<A>,
}

impl LevelLoop {
    /// Start building a loop.
    pub fn builder() -> LevelLoopBuilder<Missing> {
        LevelLoopBuilder::new()
    }
}

impl Default for LevelLoopBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelLoopBuilder<Missing> {
    pub fn new() -> Self {
        Self {
            adc: None,
            sampling: None,
            read: None,
            clock: None,
            _a: PhantomData,
        }
    }
}

impl<A> LevelLoopBuilder<A> {
    /// Provide the converter channel. The loop owns it for its lifetime.
    pub fn with_adc(self, adc: impl AnalogInput + 'static) -> LevelLoopBuilder<Set> {
        LevelLoopBuilder {
            adc: Some(Box::new(adc)),
            sampling: self.sampling,
            read: self.read,
            clock: self.clock,
            _a: PhantomData,
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingCfg) -> Self {
        self.sampling = Some(sampling);
        self
    }

    pub fn with_read(mut self, read: ReadCfg) -> Self {
        self.read = Some(read);
        self
    }

    /// Inject a clock (tests use a deterministic one). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Validate and build regardless of type-state.
    pub fn try_build(self) -> Result<LevelLoop> {
        let adc = self
            .adc
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAdc))?;
        let sampling = self.sampling.unwrap_or_default();
        let read = self.read.unwrap_or_default();
        validate(&sampling, &read)?;

        let clock: Arc<dyn Clock + Send + Sync> = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let epoch = clock.now();
        let sampler = BurstSampler::new(
            sampling.samples_avg,
            Duration::from_micros(sampling.settle_us),
            Duration::from_millis(read.timeout_ms),
            read.policy,
        );

        Ok(LevelLoop {
            adc,
            clock,
            sampler,
            baseline: sampling.baseline,
            max_consecutive_skips: read.max_consecutive_skips,
            consecutive_skips: 0,
            epoch,
            schedule: AbsoluteSchedule::new(epoch, period_from_ms(sampling.period_ms)),
            state: CycleState::AwaitingPeriod,
            stats: RunStats::default(),
        })
    }
}

impl LevelLoopBuilder<Set> {
    pub fn build(self) -> Result<LevelLoop> {
        self.try_build()
    }
}

fn validate(sampling: &SamplingCfg, read: &ReadCfg) -> Result<()> {
    let invalid = |msg: &'static str| Err(eyre::Report::new(BuildError::InvalidConfig(msg)));
    if sampling.period_ms == 0 {
        return invalid("period_ms must be >= 1");
    }
    if sampling.samples_avg == 0 {
        return invalid("samples_avg must be >= 1");
    }
    if sampling.settle_us > sampling.period_ms.saturating_mul(MICROS_PER_MILLI) {
        return invalid("settle_us must not exceed one period");
    }
    if read.timeout_ms == 0 {
        return invalid("read timeout_ms must be >= 1");
    }
    if let ReadPolicy::Retry { max_attempts: 0 } = read.policy {
        return invalid("retry max_attempts must be >= 1");
    }
    Ok(())
}

/// Generic constructor with the real-time clock; the common path for callers
/// that already hold validated configuration.
pub fn build_loop<A>(adc: A, sampling: SamplingCfg, read: ReadCfg) -> Result<LevelLoop>
where
    A: AnalogInput + 'static,
{
    LevelLoop::builder()
        .with_adc(adc)
        .with_sampling(sampling)
        .with_read(read)
        .build()
}
