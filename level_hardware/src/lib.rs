pub mod error;
pub mod mcp3208;

use level_traits::AnalogInput;
use std::time::{Duration, Instant};

use crate::error::HwError;

/// Simulated converter channel.
///
/// Produces `rest` plus bounded pseudo-random noise, optionally with a square
/// wave of height `signal` toggling every `on_ms`. Values are clamped to the
/// converter range implied by `bitwidth`. The noise generator is seeded, so
/// two instances built with the same parameters yield the same sequence.
pub struct SimulatedAdc {
    rest: i32,
    noise: i32,
    signal: i32,
    on_ms: u64,
    max_raw: i32,
    rng: u64,
    started: Instant,
    reads: u64,
    fail_every: u64,
}

impl SimulatedAdc {
    pub fn new(rest: i32, noise: i32, bitwidth: u8) -> Self {
        Self {
            rest,
            noise: noise.max(0),
            signal: 0,
            on_ms: 0,
            max_raw: max_raw_for(bitwidth),
            rng: 0x9E37_79B9_7F4A_7C15,
            started: Instant::now(),
            reads: 0,
            fail_every: 0,
        }
    }

    /// Add a square wave of `signal` counts, on for `on_ms` then off for `on_ms`.
    pub fn with_signal(mut self, signal: i32, on_ms: u64) -> Self {
        self.signal = signal;
        self.on_ms = on_ms;
        self
    }

    /// Fail every `n`th read with a timeout (0 disables).
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    fn next_noise(&mut self) -> i64 {
        // xorshift64
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        if self.noise == 0 {
            return 0;
        }
        let noise = i64::from(self.noise);
        let span = (2 * noise + 1) as u64;
        (x % span) as i64 - noise
    }

    fn signal_now(&self) -> i32 {
        if self.on_ms == 0 || self.signal == 0 {
            return 0;
        }
        let ms = self.started.elapsed().as_millis() as u64;
        if (ms / self.on_ms) % 2 == 1 {
            self.signal
        } else {
            0
        }
    }
}

impl AnalogInput for SimulatedAdc {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        self.reads = self.reads.wrapping_add(1);
        if self.fail_every > 0 && self.reads % self.fail_every == 0 {
            tracing::trace!(read = self.reads, "simulated adc timeout");
            return Err(Box::new(HwError::Timeout));
        }
        let noise = self.next_noise();
        // i64 cannot overflow here; out-of-range sums saturate at the rails.
        let sum = i64::from(self.rest) + i64::from(self.signal_now()) + noise;
        let raw = sum.clamp(0, i64::from(self.max_raw)) as i32;
        tracing::trace!(raw, "simulated adc read");
        Ok(raw)
    }
}

/// Largest raw value a converter of `bitwidth` bits can report.
pub fn max_raw_for(bitwidth: u8) -> i32 {
    let bits = u32::from(bitwidth.clamp(1, 30));
    (1i32 << bits) - 1
}

#[cfg(feature = "hardware")]
pub struct HardwareAdc {
    dev: mcp3208::Mcp3208,
}

#[cfg(feature = "hardware")]
impl HardwareAdc {
    /// Open the converter and configure one channel. Any failure here is fatal for the caller.
    pub fn new(
        bus: u8,
        slave_select: u8,
        clock_hz: u32,
        channel: u8,
        bitwidth: u8,
    ) -> Result<Self, HwError> {
        if bitwidth != mcp3208::BITWIDTH {
            return Err(HwError::UnsupportedBitwidth(bitwidth));
        }
        let dev = mcp3208::Mcp3208::new(bus, slave_select, clock_hz, channel)?;
        tracing::info!(bus, slave_select, clock_hz, channel, "mcp3208 ready");
        Ok(Self { dev })
    }
}

#[cfg(feature = "hardware")]
impl AnalogInput for HardwareAdc {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        match self.dev.read_with_timeout(timeout) {
            Ok(raw) => Ok(raw),
            Err(e) => {
                tracing::debug!(error = %e, "adc read failed");
                Err(Box::new(e))
            }
        }
    }
}
