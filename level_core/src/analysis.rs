//! Offline analysis of captured `timestamp_us,raw,level` records.
//!
//! These work on a finished capture, not on the live loop: baseline
//! estimation for calibrating `sampling.baseline`, level RMS, step-event
//! detection, and ON/OFF cycle detection with hysteresis.

use thiserror::Error;

use crate::record::CycleRecord;
use crate::util::MICROS_PER_SEC;

/// Scale factor turning a median absolute deviation into a normal-consistent sigma.
const MAD_TO_SIGMA: f64 = 1.4826;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("capture is empty")]
    Empty,
    #[error("capture needs at least {needed} rows, got {got}")]
    TooShort { needed: usize, got: usize },
    #[error("no idle segments detected; try a higher level threshold")]
    NoIdleSegments,
    #[error("no ON segments detected; try adjusting the thresholds or the smoothing window")]
    NoOnSegments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub stdev: f64,
}

impl RawStats {
    /// Nearest integer to the mean, usable as `sampling.baseline`.
    pub fn suggested_baseline(&self) -> i32 {
        round_to_i32(self.mean)
    }
}

/// Summary of the raw column.
pub fn raw_stats(records: &[CycleRecord]) -> Result<RawStats, AnalysisError> {
    if records.is_empty() {
        return Err(AnalysisError::Empty);
    }
    let raw: Vec<f64> = records.iter().map(|r| f64::from(r.raw)).collect();
    Ok(RawStats {
        count: raw.len(),
        mean: mean(&raw),
        stdev: sample_stdev(&raw),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineParams {
    /// Rows with `level` strictly below this count as idle.
    pub level_threshold: f64,
    /// Shortest idle run, in seconds, that contributes to the estimate.
    pub min_idle_s: f64,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            level_threshold: 50.0,
            min_idle_s: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaselineEstimate {
    pub segments: usize,
    pub mean: f64,
    pub stdev: f64,
}

impl BaselineEstimate {
    pub fn suggested_baseline(&self) -> i32 {
        round_to_i32(self.mean)
    }
}

/// Estimate the rest reading from long idle stretches of a capture.
///
/// The minimum run length in rows is `min_idle_s` divided by the median
/// spacing between timestamps.
pub fn estimate_baseline(
    records: &[CycleRecord],
    params: BaselineParams,
) -> Result<BaselineEstimate, AnalysisError> {
    let t = seconds_from_start(records)?;
    let dt = median_spacing(&t).ok_or(AnalysisError::TooShort {
        needed: 2,
        got: records.len(),
    })?;
    // Saturates to usize::MAX on a zero spacing, which then matches nothing.
    let min_rows = (params.min_idle_s / dt) as usize;

    let idle: Vec<bool> = records
        .iter()
        .map(|r| f64::from(r.level) < params.level_threshold)
        .collect();

    let mut segments = 0;
    let mut raw = Vec::new();
    for (start, end) in true_runs(&idle) {
        let len = end - start + 1;
        if len >= min_rows {
            segments += 1;
            raw.extend(records[start..=end].iter().map(|r| f64::from(r.raw)));
        }
    }
    if segments == 0 {
        return Err(AnalysisError::NoIdleSegments);
    }
    Ok(BaselineEstimate {
        segments,
        mean: mean(&raw),
        stdev: sample_stdev(&raw),
    })
}

/// Root mean square of the level column.
pub fn level_rms(records: &[CycleRecord]) -> Result<f64, AnalysisError> {
    if records.is_empty() {
        return Err(AnalysisError::Empty);
    }
    let sum_sq: f64 = records
        .iter()
        .map(|r| {
            let l = f64::from(r.level);
            l * l
        })
        .sum();
    Ok((sum_sq / records.len() as f64).sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventParams {
    /// Events closer than this to the previously accepted one are dropped (s).
    pub min_gap_s: f64,
    /// Threshold as a multiple of the robust sigma of the derivative.
    pub k: f64,
    /// Centered rolling-mean window applied before differentiation (rows).
    pub smooth: usize,
}

impl Default for EventParams {
    fn default() -> Self {
        Self {
            min_gap_s: 1.0,
            k: 8.0,
            smooth: 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    On,
    Off,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventKind::On => "ON",
            EventKind::Off => "OFF",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelEvent {
    pub t_s: f64,
    pub kind: EventKind,
    pub index: usize,
    pub delta: f64,
}

/// Find step changes in the (smoothed) level.
///
/// A row is a candidate when its first difference exceeds `k` robust sigmas;
/// candidates within `min_gap_s` of the last accepted event are dropped.
pub fn detect_events(
    records: &[CycleRecord],
    params: EventParams,
) -> Result<Vec<LevelEvent>, AnalysisError> {
    let t = seconds_from_start(records)?;
    let level: Vec<f64> = records.iter().map(|r| f64::from(r.level)).collect();
    let smoothed = if params.smooth > 1 {
        rolling_mean_centered(&level, params.smooth)
    } else {
        level
    };

    let mut d = vec![0.0; smoothed.len()];
    for i in 1..smoothed.len() {
        d[i] = smoothed[i] - smoothed[i - 1];
    }

    let mut sigma = robust_sigma(&d);
    if sigma == 0.0 {
        let sd = population_stdev(&d);
        sigma = if sd > 0.0 { sd } else { 1.0 };
    }
    let threshold = params.k * sigma;
    tracing::debug!(sigma, threshold, "event threshold");

    let mut events = Vec::new();
    let mut last_t = f64::NEG_INFINITY;
    for (idx, &delta) in d.iter().enumerate() {
        if delta.abs() <= threshold {
            continue;
        }
        if t[idx] - last_t < params.min_gap_s {
            continue;
        }
        events.push(LevelEvent {
            t_s: t[idx],
            kind: if delta > 0.0 {
                EventKind::On
            } else {
                EventKind::Off
            },
            index: idx,
            delta,
        });
        last_t = t[idx];
    }
    Ok(events)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleParams {
    /// Centered rolling-mean window (rows).
    pub smooth: usize,
    /// Smoothed level at or above this switches ON.
    pub on_threshold: f64,
    /// Smoothed level at or below this switches OFF.
    pub off_threshold: f64,
    /// ON segments shorter than this are discarded (s).
    pub min_on_s: f64,
    /// ON segments separated by at most this gap are merged (s).
    pub min_off_s: f64,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            smooth: 51,
            on_threshold: 1200.0,
            off_threshold: 900.0,
            min_on_s: 6.0,
            min_off_s: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub start_idx: usize,
    pub end_idx: usize,
}

impl OnSegment {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub segments: Vec<OnSegment>,
    /// Mean of the unsmoothed level over all ON rows.
    pub mean_on: f64,
    /// Population standard deviation of the same rows.
    pub stdev_on: f64,
    pub samples_on: usize,
    /// ON row count times the median timestamp spacing.
    pub approx_on_time_s: f64,
}

/// Detect ON/OFF cycles with a two-threshold hysteresis on the smoothed level.
pub fn detect_on_cycles(
    records: &[CycleRecord],
    params: CycleParams,
) -> Result<CycleReport, AnalysisError> {
    let t = seconds_from_start(records)?;
    let level: Vec<f64> = records.iter().map(|r| f64::from(r.level)).collect();
    let smoothed = rolling_mean_centered(&level, params.smooth.max(1));

    let mut on = false;
    let state: Vec<bool> = smoothed
        .iter()
        .map(|&x| {
            if !on && x >= params.on_threshold {
                on = true;
            } else if on && x <= params.off_threshold {
                on = false;
            }
            on
        })
        .collect();

    let mut merged: Vec<OnSegment> = Vec::new();
    let kept = true_runs(&state)
        .into_iter()
        .map(|(i0, i1)| OnSegment {
            start_s: t[i0],
            end_s: t[i1],
            start_idx: i0,
            end_idx: i1,
        })
        .filter(|s| s.duration_s() >= params.min_on_s);
    for seg in kept {
        match merged.last_mut() {
            Some(prev) if seg.start_s - prev.end_s <= params.min_off_s => {
                prev.end_s = seg.end_s;
                prev.end_idx = seg.end_idx;
            }
            _ => merged.push(seg),
        }
    }
    if merged.is_empty() {
        return Err(AnalysisError::NoOnSegments);
    }

    let on_levels: Vec<f64> = merged
        .iter()
        .flat_map(|s| level[s.start_idx..=s.end_idx].iter().copied())
        .collect();
    let dt = median_spacing(&t).unwrap_or(0.0);
    Ok(CycleReport {
        mean_on: mean(&on_levels),
        stdev_on: population_stdev(&on_levels),
        samples_on: on_levels.len(),
        approx_on_time_s: on_levels.len() as f64 * dt,
        segments: merged,
    })
}

// ── Numeric helpers ─────────────────────────────────────────────────────────

fn seconds_from_start(records: &[CycleRecord]) -> Result<Vec<f64>, AnalysisError> {
    let t0 = records.first().ok_or(AnalysisError::Empty)?.timestamp_us;
    Ok(records
        .iter()
        .map(|r| (i128::from(r.timestamp_us) - i128::from(t0)) as f64 / MICROS_PER_SEC as f64)
        .collect())
}

/// Inclusive `(start, end)` index pairs of each run of `true`.
fn true_runs(mask: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < mask.len() {
        if !mask[i] {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < mask.len() && mask[j] {
            j += 1;
        }
        runs.push((i, j - 1));
        i = j;
    }
    runs
}

/// Centered moving average; the window shrinks at both ends instead of padding.
pub fn rolling_mean_centered(x: &[f64], window: usize) -> Vec<f64> {
    let w = window.max(1);
    let before = w / 2;
    let after = w - 1 - before;
    let mut prefix = Vec::with_capacity(x.len() + 1);
    prefix.push(0.0);
    for v in x {
        let last = prefix.last().copied().unwrap_or(0.0);
        prefix.push(last + v);
    }
    (0..x.len())
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(x.len() - 1);
            (prefix[hi + 1] - prefix[lo]) / (hi + 1 - lo) as f64
        })
        .collect()
}

fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

fn population_stdev(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    (x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / x.len() as f64).sqrt()
}

fn sample_stdev(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let m = mean(x);
    (x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (x.len() - 1) as f64).sqrt()
}

fn median(x: &[f64]) -> Option<f64> {
    if x.is_empty() {
        return None;
    }
    let mut v = x.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    Some(if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    })
}

fn median_spacing(t: &[f64]) -> Option<f64> {
    let diffs: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
    median(&diffs)
}

/// 1.4826 * MAD, or the population stdev when the MAD is zero.
pub fn robust_sigma(x: &[f64]) -> f64 {
    let Some(med) = median(x) else {
        return 0.0;
    };
    let dev: Vec<f64> = x.iter().map(|v| (v - med).abs()).collect();
    match median(&dev) {
        Some(mad) if mad > 0.0 => MAD_TO_SIGMA * mad,
        _ => population_stdev(x),
    }
}

fn round_to_i32(x: f64) -> i32 {
    x.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn capture(period_us: i64, levels: &[i32], baseline: i32) -> Vec<CycleRecord> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &l)| CycleRecord {
                timestamp_us: i as i64 * period_us,
                raw: baseline + l,
                level: l,
            })
            .collect()
    }

    #[test]
    fn raw_stats_matches_hand_computation() {
        let recs = capture(10_000, &[0, 10, 20], 1500);
        let s = raw_stats(&recs).unwrap();
        assert_eq!(s.count, 3);
        assert!((s.mean - 1510.0).abs() < 1e-9);
        assert!((s.stdev - 10.0).abs() < 1e-9);
        assert_eq!(s.suggested_baseline(), 1510);
    }

    #[test]
    fn timestamps_at_the_i64_extremes_do_not_overflow() {
        let mut recs = capture(10_000, &[0, 0, 50, 50, 0, 0], 1500);
        recs[0].timestamp_us = i64::MIN;
        recs[5].timestamp_us = i64::MAX;
        let t = seconds_from_start(&recs).unwrap();
        assert!(t[5] > 1.8e13, "span should be about 2^64 us: {}", t[5]);

        assert!(detect_events(&recs, EventParams::default()).is_ok());
        let _ = estimate_baseline(&recs, BaselineParams::default());
        let _ = detect_on_cycles(&recs, CycleParams::default());

        recs[0].timestamp_us = i64::MAX;
        recs[5].timestamp_us = i64::MIN;
        assert!(seconds_from_start(&recs).unwrap()[5] < -1.8e13);
    }

    #[test]
    fn empty_capture_is_rejected() {
        assert_eq!(raw_stats(&[]), Err(AnalysisError::Empty));
        assert_eq!(level_rms(&[]), Err(AnalysisError::Empty));
    }

    #[test]
    fn rms_of_constant_level_is_that_level() {
        let recs = capture(10_000, &[3, -3, 3, -3], 0);
        assert!((level_rms(&recs).unwrap() - 3.0).abs() < 1e-12);
    }

    #[rstest]
    #[case(1, vec![1.0, 2.0, 3.0])]
    #[case(3, vec![1.5, 2.0, 2.5])]
    #[case(5, vec![2.0, 2.0, 2.0])]
    fn rolling_mean_shrinks_at_edges(#[case] w: usize, #[case] expected: Vec<f64>) {
        let got = rolling_mean_centered(&[1.0, 2.0, 3.0], w);
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < 1e-12, "{got:?}");
        }
    }

    #[test]
    fn robust_sigma_ignores_a_single_spike() {
        let x = [1.0, 2.0, 3.0, 4.0, 1000.0];
        // median 3, |dev| = 2,1,0,1,997 -> MAD 1
        assert!((robust_sigma(&x) - MAD_TO_SIGMA).abs() < 1e-12);
    }

    #[test]
    fn baseline_uses_long_idle_runs_only() {
        // 10 ms spacing, min idle 0.045 s -> 4 rows.
        let mut levels = vec![0; 6];
        levels.extend([400; 3]);
        levels.extend([0; 2]);
        let mut recs = capture(10_000, &levels, 1500);
        // Give the long idle run a distinguishable raw value.
        for r in recs.iter_mut().take(6) {
            r.raw = 1520;
        }
        let est = estimate_baseline(
            &recs,
            BaselineParams {
                level_threshold: 50.0,
                min_idle_s: 0.045,
            },
        )
        .unwrap();
        assert_eq!(est.segments, 1);
        assert!((est.mean - 1520.0).abs() < 1e-9);
        assert_eq!(est.suggested_baseline(), 1520);
    }

    #[test]
    fn baseline_without_idle_runs_errors() {
        let recs = capture(10_000, &[500; 10], 1500);
        assert_eq!(
            estimate_baseline(&recs, BaselineParams::default()),
            Err(AnalysisError::NoIdleSegments)
        );
    }

    #[test]
    fn baseline_needs_two_rows() {
        let recs = capture(10_000, &[0], 1500);
        assert_eq!(
            estimate_baseline(&recs, BaselineParams::default()),
            Err(AnalysisError::TooShort { needed: 2, got: 1 })
        );
    }

    #[test]
    fn detects_a_step_up_and_down() {
        let mut levels = vec![0; 300];
        levels.extend([1500; 300]);
        levels.extend([0; 300]);
        let recs = capture(10_000, &levels, 1530);
        let events = detect_events(
            &recs,
            EventParams {
                smooth: 1,
                ..EventParams::default()
            },
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::On);
        assert_eq!(events[0].index, 300);
        assert!((events[0].t_s - 3.0).abs() < 1e-9);
        assert_eq!(events[1].kind, EventKind::Off);
        assert_eq!(events[1].index, 600);
    }

    #[test]
    fn events_closer_than_min_gap_are_dropped() {
        let mut levels = vec![0; 100];
        levels.extend([1500; 20]);
        levels.extend([0; 100]);
        let recs = capture(10_000, &levels, 1530);
        let events = detect_events(
            &recs,
            EventParams {
                smooth: 1,
                min_gap_s: 1.0,
                k: 8.0,
            },
        )
        .unwrap();
        // The OFF edge is 0.2 s after the ON edge.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::On);
    }

    #[test]
    fn cycles_with_hysteresis_and_merge() {
        // 100 ms spacing: ON 8 s, dip for 0.3 s, ON 8 s, then OFF.
        let mut levels = vec![0; 20];
        levels.extend([1500; 80]);
        levels.extend([0; 3]);
        levels.extend([1500; 80]);
        levels.extend([0; 20]);
        let recs = capture(100_000, &levels, 1530);
        let report = detect_on_cycles(
            &recs,
            CycleParams {
                smooth: 1,
                ..CycleParams::default()
            },
        )
        .unwrap();
        assert_eq!(report.segments.len(), 1);
        let seg = report.segments[0];
        assert_eq!(seg.start_idx, 20);
        assert_eq!(seg.end_idx, 182);
        // Merged span includes the dip rows.
        assert_eq!(report.samples_on, 163);
        assert!((report.approx_on_time_s - 16.3).abs() < 1e-9);
    }

    #[test]
    fn short_on_bursts_are_discarded() {
        let mut levels = vec![0; 20];
        levels.extend([1500; 10]);
        levels.extend([0; 20]);
        let recs = capture(100_000, &levels, 1530);
        assert_eq!(
            detect_on_cycles(
                &recs,
                CycleParams {
                    smooth: 1,
                    ..CycleParams::default()
                }
            ),
            Err(AnalysisError::NoOnSegments)
        );
    }
}
