//! Human-readable error descriptions and structured JSON error formatting.

use level_core::analysis::AnalysisError;
use level_core::error::{BuildError, LevelError};

/// Exit code when the consecutive-skip watchdog stops the loop.
pub const EXIT_READ_FAILURES: i32 = 3;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAdc => {
                "What happened: No converter was provided to the sampling loop.\nLikely causes: The converter failed to initialize or was not wired into the builder.\nHow to fix: Ensure the converter is created successfully and passed via with_adc(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or the --period-ms/--samples/--settle-us overrides, then rerun."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LevelError>() {
        return match le {
            LevelError::Timeout => "What happened: Converter read timed out.\nLikely causes: SPI wiring, no power to the converter, or read.timeout_ms too low.\nHow to fix: Verify wiring and power, and consider increasing read.timeout_ms in the config.".to_string(),
            LevelError::ReadFailures { consecutive } => format!(
                "What happened: {consecutive} consecutive cycles were skipped because converter reads failed.\nLikely causes: Converter disconnected, bus errors, or timeout too low.\nHow to fix: Check the converter; raise read.max_consecutive_skips (0 disables) or switch read.policy to retry."
            ),
            LevelError::RetriesExhausted { attempts, last } => format!(
                "What happened: A converter read failed {attempts} times in a row (last: {last}).\nLikely causes: Intermittent bus errors.\nHow to fix: Check wiring or raise read.max_attempts."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<AnalysisError>() {
        return match ae {
            AnalysisError::NoIdleSegments => "No idle segments detected. Try increasing --level-th or lowering --min-idle-s.".to_string(),
            AnalysisError::NoOnSegments => "No ON segments detected. Try adjusting --on-th/--off-th or --smooth.".to_string(),
            other => format!("What happened: {other}.\nHow to fix: Capture more cycles with `levelmon run` and retry."),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("capture") {
        return format!(
            "What happened: Could not read the capture ({msg}).\nLikely causes: Wrong path or a file not produced by `levelmon run`.\nHow to fix: Expected rows are `timestamp_us,raw,level` with no header."
        );
    }

    if lower.contains("mcp3208") || lower.contains("spidev") {
        return format!(
            "What happened: Failed to initialize the SPI converter ({msg}).\nLikely causes: SPI disabled, wrong bus/slave select, or missing permissions on /dev/spidev*.\nHow to fix: Enable SPI, fix [adc] spi_bus/spi_slave_select, and check device permissions."
        );
    }

    const CONFIG_KEYS: [&str; 5] = ["adc.", "sampling.", "read.max", "read.timeout", "logging."];
    if lower.contains("config") || CONFIG_KEYS.iter().any(|k| lower.contains(k)) {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML.\nHow to fix: Edit the config file and try again; see etc/levelmon.toml for a sample."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for the skip watchdog, 1 for everything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<LevelError>() {
        Some(LevelError::ReadFailures { .. }) => EXIT_READ_FAILURES,
        _ => 1,
    }
}

/// Short stable name for the error kind, used as the JSON `reason`.
fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAdc => "MissingAdc",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    if let Some(le) = err.downcast_ref::<LevelError>() {
        return match le {
            LevelError::Timeout => "Timeout",
            LevelError::ReadFailures { .. } => "ReadFailures",
            LevelError::RetriesExhausted { .. } => "RetriesExhausted",
            LevelError::OutputClosed => "OutputClosed",
            LevelError::Hardware(_) | LevelError::HardwareFault(_) => "Hardware",
            LevelError::Io(_) => "Io",
        };
    }
    if err.downcast_ref::<AnalysisError>().is_some() {
        return "Analysis";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let message = humanize(err);
    let reason = reason_name(err);
    match err.downcast_ref::<LevelError>() {
        Some(LevelError::ReadFailures { consecutive }) => json!({
            "reason": reason,
            "details": { "consecutive": consecutive },
            "message": message,
        }),
        Some(LevelError::RetriesExhausted { attempts, last }) => json!({
            "reason": reason,
            "details": { "attempts": attempts, "last": last },
            "message": message,
        }),
        _ => json!({ "reason": reason, "message": message }),
    }
    .to_string()
}
