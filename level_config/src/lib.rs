#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and capture parsing for the level monitor.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section has defaults, so an empty file is a valid config.
//! - The capture CSV loader reads the loop's own stdout format back in
//!   (`t_us,raw,level`, no header) for offline analysis.
use serde::Deserialize;

/// One line of captured loop output.
///
/// No header; columns are:
/// t_us,raw,level
///
/// Example:
/// 1000,1532,2
/// 11000,1801,271
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRow {
    pub t_us: i64,
    pub raw: i32,
    pub level: i32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdcCfg {
    /// Converter channel (0..=7).
    pub channel: u8,
    /// Input attenuation in dB. Fixed per build; the SPI backend ignores it.
    pub attenuation_db: f32,
    /// Conversion resolution in bits.
    pub bitwidth: u8,
    pub spi_bus: u8,
    pub spi_slave_select: u8,
    pub spi_clock_hz: u32,
}

impl Default for AdcCfg {
    fn default() -> Self {
        Self {
            channel: 0,
            attenuation_db: 12.0,
            bitwidth: 12,
            spi_bus: 0,
            spi_slave_select: 0,
            spi_clock_hz: 1_000_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingCfg {
    /// Cycle period in milliseconds.
    pub period_ms: u64,
    /// Raw reads averaged per cycle.
    pub samples_avg: u32,
    /// Delay between consecutive raw reads (us).
    pub settle_us: u64,
    /// No-signal rest reading subtracted to form the level.
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

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicyKind {
    /// A failed read skips the whole cycle.
    #[default]
    Skip,
    /// Retry each read up to `max_attempts` before skipping the cycle.
    Retry,
    /// Reuse the last good raw value for a failed read.
    Stale,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReadCfg {
    pub policy: ReadPolicyKind,
    /// Total attempts per read under the retry policy.
    pub max_attempts: u32,
    /// Per-read timeout (ms). Also accepts alias "read_timeout_ms".
    #[serde(alias = "read_timeout_ms")]
    pub timeout_ms: u64,
    /// Stop the loop after this many skipped cycles in a row (0 disables).
    pub max_consecutive_skips: u32,
}

impl Default for ReadCfg {
    fn default() -> Self {
        Self {
            policy: ReadPolicyKind::Skip,
            max_attempts: 3,
            timeout_ms: 5,
            max_consecutive_skips: 0,
        }
    }
}

/// Parameters for the simulated converter used when no hardware backend is built.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub rest: i32,
    pub noise: i32,
    pub signal: i32,
    pub on_ms: u64,
    /// Fail every Nth read with a timeout (0 disables).
    pub fail_every: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            rest: 1530,
            noise: 12,
            signal: 0,
            on_ms: 0,
            fail_every: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub adc: AdcCfg,
    pub sampling: SamplingCfg,
    pub read: ReadCfg,
    pub sim: SimCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

const ATTENUATIONS_DB: [f32; 5] = [0.0, 2.5, 6.0, 11.0, 12.0];

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // ADC
        if self.adc.channel > 7 {
            eyre::bail!("adc.channel must be in 0..=7");
        }
        if !(9..=16).contains(&self.adc.bitwidth) {
            eyre::bail!("adc.bitwidth must be in 9..=16");
        }
        if !ATTENUATIONS_DB
            .iter()
            .any(|a| (a - self.adc.attenuation_db).abs() < f32::EPSILON)
        {
            eyre::bail!("adc.attenuation_db must be one of 0, 2.5, 6, 11, 12");
        }
        if self.adc.spi_clock_hz == 0 {
            eyre::bail!("adc.spi_clock_hz must be > 0");
        }

        // Sampling
        if self.sampling.period_ms == 0 {
            eyre::bail!("sampling.period_ms must be >= 1");
        }
        if self.sampling.period_ms > 60 * 60 * 1000 {
            eyre::bail!("sampling.period_ms is unreasonably large (>1h)");
        }
        if self.sampling.samples_avg == 0 {
            eyre::bail!("sampling.samples_avg must be >= 1");
        }
        if self.sampling.settle_us > self.sampling.period_ms.saturating_mul(1000) {
            eyre::bail!("sampling.settle_us must not exceed one period");
        }
        let max_raw = (1i64 << self.adc.bitwidth) - 1;
        if !(0..=max_raw).contains(&i64::from(self.sampling.baseline)) {
            eyre::bail!("sampling.baseline must be within 0..={max_raw} for the configured bitwidth");
        }

        // Read policy
        if self.read.max_attempts == 0 {
            eyre::bail!("read.max_attempts must be >= 1");
        }
        if self.read.timeout_ms == 0 {
            eyre::bail!("read.timeout_ms must be >= 1");
        }

        // Sim
        for (key, value) in [
            ("rest", self.sim.rest),
            ("signal", self.sim.signal),
            ("noise", self.sim.noise),
        ] {
            if !(0..=max_raw).contains(&i64::from(value)) {
                eyre::bail!("sim.{key} must be within 0..={max_raw} for the configured bitwidth");
            }
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref() {
            if !matches!(r, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never, daily, hourly");
            }
        }

        Ok(())
    }
}

/// Parse captured loop output from any reader. Rows must be `t_us,raw,level`.
pub fn parse_capture<R: std::io::Read>(rdr: R) -> eyre::Result<Vec<CaptureRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CaptureRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid capture row {}: {}", idx + 1, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("capture contains no rows");
    }
    Ok(rows)
}

pub fn load_capture_csv(path: &std::path::Path) -> eyre::Result<Vec<CaptureRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open capture CSV {:?}: {}", path, e))?;
    parse_capture(std::io::BufReader::new(file))
        .map_err(|e| eyre::eyre!("capture CSV {:?}: {}", path, e))
}
