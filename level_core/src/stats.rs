//! Running statistics for a loop run: cycle counts and per-cycle work time.
//!
//! Work time is accumulated online (Welford) so an unbounded run does not
//! grow memory.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Cycles attempted (emitted + skipped).
    pub cycles: u64,
    pub emitted: u64,
    pub skipped: u64,
    /// Cycles whose work ran past the period boundary.
    pub overruns: u64,
    work_n: u64,
    work_min_us: u64,
    work_max_us: u64,
    work_mean_us: f64,
    work_m2: f64,
}

impl RunStats {
    pub(crate) fn record_work(&mut self, work_us: u64) {
        if self.work_n == 0 || work_us < self.work_min_us {
            self.work_min_us = work_us;
        }
        self.work_max_us = self.work_max_us.max(work_us);
        self.work_n += 1;
        let n = self.work_n as f64;
        let x = work_us as f64;
        let delta = x - self.work_mean_us;
        self.work_mean_us += delta / n;
        self.work_m2 += delta * (x - self.work_mean_us);
    }

    pub fn work_min_us(&self) -> u64 {
        self.work_min_us
    }

    pub fn work_max_us(&self) -> u64 {
        self.work_max_us
    }

    pub fn work_mean_us(&self) -> f64 {
        self.work_mean_us
    }

    /// Sample standard deviation of work time; 0 with fewer than two cycles.
    pub fn work_stdev_us(&self) -> f64 {
        if self.work_n > 1 {
            (self.work_m2 / (self.work_n - 1) as f64).sqrt()
        } else {
            0.0
        }
    }
}
