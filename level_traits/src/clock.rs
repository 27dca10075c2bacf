use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for sampling and scheduling.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - sleep_until(): absolute-deadline sleep; returns at once if the deadline passed
/// - us_since()/ms_since(): elapsed time from an epoch Instant
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Sleep until `deadline`. A deadline at or before `now()` does not sleep.
    fn sleep_until(&self, deadline: Instant) {
        let now = self.now();
        if deadline > now {
            self.sleep(deadline - now);
        }
    }

    /// Microseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn us_since(&self, epoch: Instant) -> u64 {
        let us = self.now().saturating_duration_since(epoch).as_micros();
        us.min(u128::from(u64::MAX)) as u64
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, d: Duration) {
        (**self).sleep(d);
    }

    fn sleep_until(&self, deadline: Instant) {
        (**self).sleep_until(deadline);
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

/// Below this, `sleep` spins instead of yielding to the OS scheduler; thread
/// wake-up latency on a desktop kernel is in the same range as the settle delay.
const SPIN_BELOW: Duration = Duration::from_micros(200);

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        if d < SPIN_BELOW {
            let deadline = Instant::now() + d;
            while Instant::now() < deadline {
                std::hint::spin_loop();
            }
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic test clock whose time can be advanced manually.
    ///
    /// now() = origin + offset
    /// sleep(d) advances internal time by d without actually sleeping.
    /// Clones share the same timeline, so a fake converter can "spend" time too.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
                slept: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// The Instant corresponding to offset zero.
        pub fn origin(&self) -> Instant {
            self.origin
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Current offset from origin.
        pub fn elapsed(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }

        /// Every duration passed to `sleep`, in call order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().map(|g| g.clone()).unwrap_or_default()
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            if let Ok(mut s) = self.slept.lock() {
                s.push(d);
            }
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn sleep_until_past_deadline_does_not_sleep() {
        let clock = TestClock::new();
        clock.advance(Duration::from_millis(5));
        clock.sleep_until(clock.origin() + Duration::from_millis(3));
        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.elapsed(), Duration::from_millis(5));
    }

    #[test]
    fn sleep_until_future_deadline_lands_exactly() {
        let clock = TestClock::new();
        clock.advance(Duration::from_micros(2_300));
        clock.sleep_until(clock.origin() + Duration::from_millis(10));
        assert_eq!(clock.elapsed(), Duration::from_millis(10));
        assert_eq!(clock.sleeps(), vec![Duration::from_micros(7_700)]);
    }

    #[test]
    fn us_since_saturates_for_future_epoch() {
        let clock = TestClock::new();
        let future = clock.now() + Duration::from_secs(1);
        assert_eq!(clock.us_since(future), 0);
        clock.advance(Duration::from_micros(1_234));
        assert_eq!(clock.us_since(clock.origin()), 1_234);
        assert_eq!(clock.ms_since(clock.origin()), 1);
    }

    #[test]
    fn monotonic_short_sleep_spins_at_least_requested() {
        let clock = MonotonicClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_micros(80));
        assert!(start.elapsed() >= Duration::from_micros(80));
    }
}
