use std::io::Write;
use std::sync::atomic::AtomicBool;

use level_traits::AnalogInput;

use crate::builder::build_loop;
use crate::config::{ReadCfg, SamplingCfg};
use crate::error::Result as CoreResult;
use crate::stats::RunStats;
use crate::status::CycleStatus;

/// Everything a run needs besides the converter and the output.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub sampling: SamplingCfg,
    pub read: ReadCfg,
    /// Stop after this many attempted cycles; `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

/// Run the sampling loop on the real-time clock until shutdown, cycle limit,
/// or closed output. Returns the run statistics.
///
/// `on_exit` sees the statistics of every loop that started, including one
/// aborted by the consecutive-failure watchdog.
pub fn run<A, W, F>(
    adc: A,
    out: &mut W,
    params: RunParams,
    shutdown: &AtomicBool,
    on_exit: F,
) -> CoreResult<RunStats>
where
    A: AnalogInput + 'static,
    W: Write + ?Sized,
    F: FnOnce(&RunStats),
{
    let mut lp = build_loop(adc, params.sampling, params.read)?;
    let result = lp.run(out, shutdown, params.max_cycles);
    on_exit(lp.stats());
    result
}

/// Take a single burst and return the averaged reading. Used for health checks;
/// nothing is written and the schedule is not involved.
pub fn self_check<A>(adc: A, sampling: SamplingCfg, read: ReadCfg) -> CoreResult<i32>
where
    A: AnalogInput + 'static,
{
    let mut lp = build_loop(adc, sampling, read)?;
    lp.begin();
    let mut sink = std::io::sink();
    match lp.step(&mut sink)? {
        CycleStatus::Emitted(rec) => Ok(rec.raw),
        CycleStatus::Skipped(e) => Err(crate::error::Report::new(e)),
    }
}
