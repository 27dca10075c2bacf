mod analyze;
mod cli;
mod error_fmt;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{RtOpts, SamplingOverrides};

fn main() {
    if let Err(err) = real_main() {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    // Analysis never touches the converter; a broken config file must not block it.
    let (mut cfg, found) = match cli.cmd {
        Commands::Analyze { .. } => (level_config::Config::default(), false),
        _ => load_config(&cli.config)?,
    };
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    if !found && !matches!(cli.cmd, Commands::Analyze { .. }) {
        tracing::info!(path = %cli.config.display(), "config file not found; using defaults");
    }

    match cli.cmd {
        Commands::Run {
            cycles,
            period_ms,
            samples,
            baseline,
            settle_us,
            stats,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => {
            SamplingOverrides {
                period_ms,
                samples,
                baseline,
                settle_us,
            }
            .apply(&mut cfg);
            cfg.validate()?;

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }

            let adc = run::open_adc(&cfg)?;
            run::run_levels(
                &cfg,
                adc,
                cycles,
                stats,
                RtOpts {
                    enabled: rt,
                    prio: rt_prio,
                    lock: rt_lock,
                    cpu: rt_cpu,
                },
                shutdown,
            )?;
        }
        Commands::SelfCheck => {
            cfg.validate()?;
            let adc = run::open_adc(&cfg)?;
            let raw = run::self_check(&cfg, adc)?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok", "raw": raw }));
            } else {
                println!("ok raw={raw}");
            }
        }
        Commands::Analyze { ref kind } => analyze::run_analysis(kind, cli.json)?,
    }
    Ok(())
}

/// Read and parse the TOML config. A missing file yields defaults and `false`.
fn load_config(path: &Path) -> eyre::Result<(level_config::Config, bool)> {
    if !path.exists() {
        return Ok((level_config::Config::default(), false));
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = level_config::load_toml(&text)
        .wrap_err_with(|| format!("invalid config TOML in {}", path.display()))?;
    Ok((cfg, true))
}

/// Console logs go to stderr so stdout carries only records.
fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &level_config::Logging,
) -> eyre::Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
