//! Scheduling behaviour on the deterministic test clock.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use level_core::mocks::ScriptedAdc;
use level_core::{LevelLoop, ReadCfg, SamplingCfg};
use level_traits::clock::test_clock::TestClock;

fn timestamps(out: &[u8]) -> Vec<i64> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(|l| l.split(',').next().unwrap().parse().unwrap())
        .collect()
}

/// A converter that takes `per_read` of clock time per read, except read 0
/// which takes `first_read`.
fn timed_adc(clock: &TestClock, first_read: Duration, per_read: Duration) -> ScriptedAdc {
    let c = clock.clone();
    ScriptedAdc::from_values([1650]).with_read_hook(move |idx| {
        c.advance(if idx == 0 { first_read } else { per_read });
    })
}

#[test]
fn ten_thousand_cycles_have_exact_period_spacing() {
    let clock = TestClock::new();
    let adc = timed_adc(&clock, Duration::from_micros(50), Duration::from_micros(50));
    let mut lp = LevelLoop::builder()
        .with_adc(adc)
        .with_sampling(SamplingCfg::default())
        .with_clock(clock.clone())
        .build()
        .unwrap();

    let mut out = Vec::new();
    let stats = lp
        .run(&mut out, &AtomicBool::new(false), Some(10_000))
        .unwrap();

    let ts = timestamps(&out);
    assert_eq!(ts.len(), 10_000);
    for (k, t) in ts.iter().enumerate() {
        assert_eq!(*t, k as i64 * 10_000, "cycle {k} drifted");
    }
    assert_eq!(stats.overruns, 0);
    assert_eq!(stats.emitted, 10_000);
    // 16 reads * 50 us + 15 settles * 80 us
    assert_eq!(stats.work_max_us(), 2_000);
}

#[test]
fn single_overrun_starts_next_cycle_immediately_then_recovers() {
    let clock = TestClock::new();
    let adc = timed_adc(&clock, Duration::from_millis(15), Duration::from_micros(50));
    let mut lp = LevelLoop::builder()
        .with_adc(adc)
        .with_clock(clock.clone())
        .build()
        .unwrap();

    let mut out = Vec::new();
    let stats = lp.run(&mut out, &AtomicBool::new(false), Some(4)).unwrap();

    let ts = timestamps(&out);
    // 15 ms + 15 * 50 us + 15 * 80 us of work in the first cycle.
    assert_eq!(ts, vec![0, 16_950, 26_950, 36_950]);
    assert_eq!(stats.overruns, 1);
    assert_eq!(stats.skipped, 0);
}

#[test]
fn persistent_overrun_never_bursts() {
    let clock = TestClock::new();
    let adc = timed_adc(&clock, Duration::from_millis(1), Duration::from_millis(1));
    let mut lp = LevelLoop::builder()
        .with_adc(adc)
        .with_clock(clock.clone())
        .build()
        .unwrap();

    let mut out = Vec::new();
    let stats = lp.run(&mut out, &AtomicBool::new(false), Some(50)).unwrap();

    let ts = timestamps(&out);
    assert_eq!(ts.len(), 50);
    // Every gap equals the work time (16 ms + 1.2 ms), never shorter.
    assert!(ts.windows(2).all(|w| w[1] - w[0] == 17_200));
    assert_eq!(stats.overruns, 50);
    assert_eq!(stats.emitted, 50);
}

#[test]
fn settle_delay_comes_from_config() {
    let clock = TestClock::new();
    let mut lp = LevelLoop::builder()
        .with_adc(ScriptedAdc::from_values([1600]))
        .with_sampling(SamplingCfg {
            samples_avg: 4,
            settle_us: 250,
            ..SamplingCfg::default()
        })
        .with_read(ReadCfg::default())
        .with_clock(clock.clone())
        .build()
        .unwrap();

    let mut out = Vec::new();
    lp.run(&mut out, &AtomicBool::new(false), Some(1)).unwrap();

    let sleeps = clock.sleeps();
    // Three settles, then the wait to the period boundary.
    assert_eq!(&sleeps[..3], &[Duration::from_micros(250); 3]);
    assert_eq!(sleeps[3], Duration::from_micros(10_000 - 750));
}
