//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "levelmon", version, about = "Periodic averaged level sampler")]
pub struct Cli {
    /// Path to config TOML; a missing file means built-in defaults
    #[arg(long, value_name = "FILE", default_value = "etc/levelmon.toml")]
    pub config: PathBuf,

    /// Log and report errors as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample continuously and write `timestamp_us,raw,level` lines to stdout
    Run {
        /// Stop after this many cycles (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Override sampling.period_ms
        #[arg(long, value_name = "MS")]
        period_ms: Option<u64>,
        /// Override sampling.samples_avg
        #[arg(long, value_name = "N")]
        samples: Option<u32>,
        /// Override sampling.baseline
        #[arg(long, value_name = "RAW", allow_negative_numbers = true)]
        baseline: Option<i32>,
        /// Override sampling.settle_us
        #[arg(long, value_name = "US")]
        settle_us: Option<u64>,
        /// Print cycle and timing stats to stderr on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux: SCHED_FIFO priority, CPU pinning, and mlockall. Failures are logged as warnings and sampling continues. May require CAP_SYS_NICE / CAP_IPC_LOCK or root."
        )]
        rt: bool,
        /// SCHED_FIFO priority for --rt (Linux; clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE")]
        rt_lock: Option<RtLock>,
        /// CPU index to pin to for --rt (Linux; default 0)
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Initialize the converter, take one averaged burst, print `ok raw=<n>`
    SelfCheck,
    /// Offline analysis of a captured `timestamp_us,raw,level` file
    Analyze {
        #[command(subcommand)]
        kind: AnalyzeKind,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AnalyzeKind {
    /// Mean and standard deviation of raw; suggested baseline
    Stats {
        csv: PathBuf,
    },
    /// Baseline from long idle stretches
    Baseline {
        csv: PathBuf,
        /// Rows with level below this are idle
        #[arg(long, default_value_t = 50.0)]
        level_th: f64,
        /// Minimum idle duration in seconds
        #[arg(long, default_value_t = 5.0)]
        min_idle_s: f64,
    },
    /// Root mean square of level
    Rms {
        csv: PathBuf,
    },
    /// Step events in the smoothed level
    Events {
        csv: PathBuf,
        /// Minimum time between events (s)
        #[arg(long, default_value_t = 1.0)]
        min_gap_s: f64,
        /// Threshold multiplier for the derivative's robust sigma
        #[arg(long, default_value_t = 8.0)]
        k: f64,
        /// Rolling mean window (rows) before detection
        #[arg(long, default_value_t = 11)]
        smooth: usize,
    },
    /// ON/OFF cycles via hysteresis
    Cycles {
        csv: PathBuf,
        /// Rolling mean window (rows)
        #[arg(long, default_value_t = 51)]
        smooth: usize,
        /// Smoothed level at or above this switches ON
        #[arg(long, default_value_t = 1200.0)]
        on_th: f64,
        /// Smoothed level at or below this switches OFF
        #[arg(long, default_value_t = 900.0)]
        off_th: f64,
        /// Minimum ON duration (s) to keep
        #[arg(long, default_value_t = 6.0)]
        min_on_s: f64,
        /// ON segments separated by at most this gap (s) are merged
        #[arg(long, default_value_t = 0.5)]
        min_off_s: f64,
    },
}
