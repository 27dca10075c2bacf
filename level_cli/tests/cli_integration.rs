use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Noise-free simulator so raw values are predictable.
fn write_valid_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[adc]
channel = 0
bitwidth = 12

[sampling]
period_ms = 5
samples_avg = 4
settle_us = 80
baseline = 1500

[read]
policy = "skip"
timeout_ms = 5

[sim]
rest = 1530
noise = 0
{extra}
"#
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn levelmon() -> Command {
    Command::cargo_bin("levelmon").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--cycles", "3"], 0, ",1530,30", "stdout")]
#[case(&["self-check"], 0, "ok raw=1530", "stdout")]
#[case(&["run", "--samples", "many"], 2, "invalid value", "stderr")]
#[case(&["run", "--cycles", "1", "--samples", "0"], 1, "samples_avg", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");

    let mut cmd = levelmon();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn run_writes_one_record_per_cycle() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");

    let out = levelmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--cycles", "5", "--baseline", "1000"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let text = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5, "{text}");
    let line_re = predicate::str::is_match(r"^\d+,1530,530$").unwrap();
    let mut last_ts = -1i64;
    for l in &lines {
        assert!(line_re.eval(l), "bad line: {l}");
        let ts: i64 = l.split(',').next().unwrap().parse().unwrap();
        assert!(ts > last_ts);
        last_ts = ts;
    }
    // Five 5 ms cycles: the last starts about 20 ms in.
    assert!(last_ts >= 20_000, "last timestamp {last_ts}");
}

#[rstest]
fn logs_stay_off_stdout() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");
    levelmon()
        .arg("--config")
        .arg(&cfg)
        .args(["--log-level", "debug", "run", "--cycles", "2"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^(\d+,\d+,\d+\n){2}$").unwrap())
        .stderr(predicate::str::contains("sampling loop start"));
}

#[rstest]
fn missing_config_file_uses_defaults() {
    let dir = tempdir().unwrap();
    levelmon()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["run", "--cycles", "2", "--period-ms", "2", "--samples", "1"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^(\d+,\d+,\d+\n){2}$").unwrap());
}

#[rstest]
fn stats_are_printed_to_stderr() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");
    levelmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--cycles", "3", "--stats"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Cycles: 3 (emitted 3, skipped 0)"));
}

#[rstest]
fn skip_watchdog_exits_with_code_three() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");
    fs::write(
        &cfg,
        fs::read_to_string(&cfg)
            .unwrap()
            .replace("timeout_ms = 5", "timeout_ms = 5\nmax_consecutive_skips = 3"),
    )
    .unwrap();

    levelmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run"])
        .env("LEVEL_SIM_FAIL_EVERY", "1")
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("consecutive cycles were skipped"));
}

#[rstest]
fn stats_are_printed_when_the_watchdog_aborts() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");
    fs::write(
        &cfg,
        fs::read_to_string(&cfg)
            .unwrap()
            .replace("timeout_ms = 5", "timeout_ms = 5\nmax_consecutive_skips = 3"),
    )
    .unwrap();

    levelmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--stats"])
        .env("LEVEL_SIM_FAIL_EVERY", "1")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Cycles: 3 (emitted 0, skipped 3)"))
        .stderr(predicate::str::contains("consecutive cycles were skipped"));
}

#[rstest]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");
    fs::write(
        &cfg,
        fs::read_to_string(&cfg)
            .unwrap()
            .replace("timeout_ms = 5", "timeout_ms = 5\nmax_consecutive_skips = 2"),
    )
    .unwrap();

    let out = levelmon()
        .arg("--config")
        .arg(&cfg)
        .args(["--json", "--log-level", "error", "run"])
        .env("LEVEL_SIM_FAIL_EVERY", "1")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "ReadFailures");
    assert_eq!(v["details"]["consecutive"], 2);
}

#[rstest]
fn intermittent_failures_only_skip_cycles() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "");
    // samples_avg = 4 and every 6th read fails: some bursts are lost, the run goes on.
    let out = levelmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--cycles", "6", "--stats"])
        .env("LEVEL_SIM_FAIL_EVERY", "6")
        .output()
        .unwrap();
    assert!(out.status.success());
    let lines = String::from_utf8(out.stdout).unwrap().lines().count();
    assert!(lines < 6 && lines > 0, "lines: {lines}");
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("Cycles: 6"), "{stderr}");
}

#[rstest]
fn invalid_toml_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[sampling]\nperiod_ms = \"fast\"\n").unwrap();
    levelmon()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}
