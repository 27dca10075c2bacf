//! The `analyze` command: offline reports over a captured run.

use level_core::CycleRecord;
use level_core::analysis::{self, BaselineParams, CycleParams, EventParams};
use serde_json::json;

use crate::cli::AnalyzeKind;

fn load(path: &std::path::Path) -> eyre::Result<Vec<CycleRecord>> {
    let rows = level_config::load_capture_csv(path)?;
    tracing::debug!(rows = rows.len(), path = %path.display(), "capture loaded");
    Ok(rows.iter().map(CycleRecord::from).collect())
}

/// Nearest integer; half-way values round away from zero.
fn rounded(x: f64) -> i64 {
    x.round() as i64
}

pub fn run_analysis(kind: &AnalyzeKind, json_out: bool) -> eyre::Result<()> {
    match kind {
        AnalyzeKind::Stats { csv } => {
            let s = analysis::raw_stats(&load(csv)?)?;
            if json_out {
                println!(
                    "{}",
                    json!({ "rows": s.count, "mean_raw": s.mean, "std_raw": s.stdev, "suggested_baseline": s.suggested_baseline() })
                );
            } else {
                println!("Mean raw = {:.2}", s.mean);
                println!("Std  raw = {:.2}", s.stdev);
                println!("Suggested baseline constant = {}", s.suggested_baseline());
            }
        }
        AnalyzeKind::Baseline {
            csv,
            level_th,
            min_idle_s,
        } => {
            let est = analysis::estimate_baseline(
                &load(csv)?,
                BaselineParams {
                    level_threshold: *level_th,
                    min_idle_s: *min_idle_s,
                },
            )?;
            if json_out {
                println!(
                    "{}",
                    json!({ "segments": est.segments, "baseline_raw": est.mean, "std_raw": est.stdev, "suggested_baseline": est.suggested_baseline() })
                );
            } else {
                println!("Detected idle segments: {}", est.segments);
                println!("Baseline raw = {:.2} +/- {:.2}", est.mean, est.stdev);
                println!("Suggested baseline constant: {}", est.suggested_baseline());
            }
        }
        AnalyzeKind::Rms { csv } => {
            let rms = analysis::level_rms(&load(csv)?)?;
            if json_out {
                println!("{}", json!({ "rms_level": rms, "rounded": rounded(rms) }));
            } else {
                println!("RMS(level) = {rms:.3}");
                println!("Rounded     = {}", rounded(rms));
            }
        }
        AnalyzeKind::Events {
            csv,
            min_gap_s,
            k,
            smooth,
        } => {
            let events = analysis::detect_events(
                &load(csv)?,
                EventParams {
                    min_gap_s: *min_gap_s,
                    k: *k,
                    smooth: *smooth,
                },
            )?;
            if json_out {
                let list: Vec<_> = events
                    .iter()
                    .map(|e| json!({ "time_s": e.t_s, "type": e.kind.to_string(), "index": e.index, "delta_level": e.delta }))
                    .collect();
                println!("{}", json!({ "events": list }));
            } else {
                println!("Detected events: {}", events.len());
                println!("time_s,type,index,delta_level");
                for e in &events {
                    println!("{:.3},{},{},{:.1}", e.t_s, e.kind, e.index, e.delta);
                }
            }
        }
        AnalyzeKind::Cycles {
            csv,
            smooth,
            on_th,
            off_th,
            min_on_s,
            min_off_s,
        } => {
            let report = analysis::detect_on_cycles(
                &load(csv)?,
                CycleParams {
                    smooth: *smooth,
                    on_threshold: *on_th,
                    off_threshold: *off_th,
                    min_on_s: *min_on_s,
                    min_off_s: *min_off_s,
                },
            )?;
            if json_out {
                let segs: Vec<_> = report
                    .segments
                    .iter()
                    .map(|s| json!({ "on_s": s.start_s, "off_s": s.end_s, "duration_s": s.duration_s() }))
                    .collect();
                println!(
                    "{}",
                    json!({
                        "segments": segs,
                        "mean_on": report.mean_on,
                        "std_on": report.stdev_on,
                        "samples_on": report.samples_on,
                        "approx_on_time_s": report.approx_on_time_s,
                    })
                );
            } else {
                println!("Detected ON intervals (seconds from start):");
                for (k, s) in report.segments.iter().enumerate() {
                    println!(
                        "{}: ON at {:.3}s  OFF at {:.3}s   duration={:.2}s",
                        k + 1,
                        s.start_s,
                        s.end_s,
                        s.duration_s()
                    );
                }
                println!();
                println!("Mean level while ON:");
                println!(
                    "mean={:.2}  std={:.2}  samples={}  approx_on_time={:.1}s",
                    report.mean_on, report.stdev_on, report.samples_on, report.approx_on_time_s
                );
            }
        }
    }
    Ok(())
}
