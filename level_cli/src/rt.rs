//! Real-time scheduling helpers (Linux SCHED_FIFO / affinity / mlockall).
//!
//! Every step is best effort: a failure is logged as a warning and the
//! sampler keeps running with normal scheduling.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(lock) {
            Ok(()) => tracing::info!(mode = ?lock, "rt: memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "rt: mlockall failed"),
        }
        match apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(prio = p, "rt: SCHED_FIFO applied"),
            Err(err) => tracing::warn!(error = %err, ?prio, "rt: sched_setscheduler failed"),
        }
        let cpu = rt_cpu.unwrap_or(0);
        match apply_affinity(cpu) {
            Ok(()) => tracing::info!(cpu, "rt: pinned to cpu"),
            Err(err) => tracing::warn!(error = %err, cpu, "rt: affinity not applied"),
        }
    });
}

#[cfg(target_os = "linux")]
fn apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    let rc = unsafe { mlockall(flags) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM);
    // All failed on limits; Current alone may still fit.
    if retryable && lock == RtLock::All && unsafe { mlockall(MCL_CURRENT) } == 0 {
        tracing::warn!(error = %err, "rt: mlockall(current|future) failed, locked current only");
        return Ok(());
    }
    if retryable {
        eyre::bail!("{err}; hint: needs CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(err))
}

#[cfg(target_os = "linux")]
fn apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio_val = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio_val,
    };
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            eyre::bail!("{err}; hint: needs CAP_SYS_NICE or root");
        }
        return Err(eyre::eyre!(err));
    }
    Ok(prio_val)
}

#[cfg(target_os = "linux")]
fn apply_affinity(cpu: usize) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};

    let capacity = std::mem::size_of::<cpu_set_t>() * 8;
    if cpu >= capacity {
        eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {capacity}");
    }
    let mut allowed: cpu_set_t = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut allowed) };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    if !unsafe { CPU_ISSET(cpu, &allowed) } {
        eyre::bail!("CPU {cpu} not permitted by current affinity mask");
    }
    let mut desired: cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe {
        CPU_ZERO(&mut desired);
        CPU_SET(cpu, &mut desired);
    }
    let rc = unsafe { libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &desired) };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, lock: RtLock, _rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        tracing::warn!(mode = ?lock, "rt: real-time mode is only supported on Linux; ignoring --rt");
    });
}
