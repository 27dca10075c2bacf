//! The `run` and `self-check` commands: config mapping, converter assembly, loop execution.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use level_core::RunStats;
use level_core::error::Result as CoreResult;
use level_core::runner::RunParams;
use level_traits::AnalogInput;

use crate::cli::RtLock;
use crate::rt::setup_rt_once;

/// Per-run command-line overrides of the `[sampling]` section.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingOverrides {
    pub period_ms: Option<u64>,
    pub samples: Option<u32>,
    pub baseline: Option<i32>,
    pub settle_us: Option<u64>,
}

impl SamplingOverrides {
    pub fn apply(&self, cfg: &mut level_config::Config) {
        if let Some(ms) = self.period_ms {
            cfg.sampling.period_ms = ms;
        }
        if let Some(n) = self.samples {
            cfg.sampling.samples_avg = n;
        }
        if let Some(b) = self.baseline {
            cfg.sampling.baseline = b;
        }
        if let Some(us) = self.settle_us {
            cfg.sampling.settle_us = us;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RtOpts {
    pub enabled: bool,
    pub prio: Option<i32>,
    pub lock: Option<RtLock>,
    pub cpu: Option<usize>,
}

/// Open the configured converter.
///
/// With the `hardware` feature this is the MCP3208 on the configured SPI bus;
/// otherwise the simulator, tunable through `[sim]` and the `LEVEL_SIM_*`
/// environment variables (used by the integration tests).
#[cfg(feature = "hardware")]
pub fn open_adc(cfg: &level_config::Config) -> eyre::Result<Box<dyn AnalogInput>> {
    let adc = level_hardware::HardwareAdc::new(
        cfg.adc.spi_bus,
        cfg.adc.spi_slave_select,
        cfg.adc.spi_clock_hz,
        cfg.adc.channel,
        cfg.adc.bitwidth,
    )
    .wrap_err("open mcp3208")?;
    Ok(Box::new(adc))
}

#[cfg(not(feature = "hardware"))]
pub fn open_adc(cfg: &level_config::Config) -> eyre::Result<Box<dyn AnalogInput>> {
    let rest = env_override("LEVEL_SIM_REST", cfg.sim.rest)?;
    let fail_every = env_override("LEVEL_SIM_FAIL_EVERY", cfg.sim.fail_every)?;
    let adc = level_hardware::SimulatedAdc::new(rest, cfg.sim.noise, cfg.adc.bitwidth)
        .with_signal(cfg.sim.signal, cfg.sim.on_ms)
        .with_fail_every(fail_every);
    tracing::info!(
        rest,
        noise = cfg.sim.noise,
        signal = cfg.sim.signal,
        fail_every,
        "using simulated converter"
    );
    Ok(Box::new(adc))
}

#[cfg(not(feature = "hardware"))]
fn env_override<T>(key: &str, default: T) -> eyre::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .wrap_err_with(|| format!("invalid {key}={v:?}")),
        Err(_) => Ok(default),
    }
}

/// Run the sampling loop to stdout until Ctrl-C, the cycle limit, or a closed pipe.
pub fn run_levels(
    cfg: &level_config::Config,
    adc: impl AnalogInput + 'static,
    max_cycles: Option<u64>,
    stats: bool,
    rt: RtOpts,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunStats> {
    // Real-time mode setup, once per process
    setup_rt_once(
        rt.enabled,
        rt.prio,
        rt.lock.unwrap_or(RtLock::os_default()),
        rt.cpu,
    );

    let params = RunParams {
        sampling: (&cfg.sampling).into(),
        read: (&cfg.read).into(),
        max_cycles,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    level_core::runner::run(adc, &mut out, params, &shutdown, |summary| {
        if stats {
            print_stats(summary, cfg.sampling.period_ms);
        }
    })
}

/// One averaged burst from the configured converter.
pub fn self_check(cfg: &level_config::Config, adc: impl AnalogInput + 'static) -> CoreResult<i32> {
    level_core::runner::self_check(adc, (&cfg.sampling).into(), (&cfg.read).into())
}

/// Print cycle counts and work-time stats to stderr.
fn print_stats(stats: &RunStats, period_ms: u64) {
    let period_us = level_core::util::period_us(period_ms);
    eprintln!("\n--- levelmon stats ---");
    eprintln!(
        "Cycles: {} (emitted {}, skipped {})",
        stats.cycles, stats.emitted, stats.skipped
    );
    eprintln!("Period (us): {period_us}");
    eprintln!(
        "Work min/avg/max/stdev (us): {} / {:.1} / {} / {:.1}",
        stats.work_min_us(),
        stats.work_mean_us(),
        stats.work_max_us(),
        stats.work_stdev_us()
    );
    eprintln!("Overruns (> period): {}", stats.overruns);
    eprintln!("----------------------\n");
}
