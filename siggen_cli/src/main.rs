#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod interactive;
mod session;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::session::{Overrides, Session};

const DEFAULT_LEVEL: &str = "info";

fn init_tracing(json: bool, level: &str, logging: &siggen_config::Logging) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    // stdout carries command output; logs go to stderr
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("failed to initialize tracing: {e}"))
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = session::load_config(cli.config.as_deref())?;
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or(DEFAULT_LEVEL);
    init_tracing(cli.json, level, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    let mut overrides = Overrides {
        units: cli.units.as_deref(),
        channel: cli.channel,
        debounce_ms: None,
    };

    match cli.cmd {
        Commands::Features => session::features(&cfg, cli.json),
        Commands::Show { feature } => {
            let mut s = Session::open(&cfg, &overrides)?;
            session::show(&mut s, &feature, cli.json)
        }
        Commands::Set {
            feature,
            assignments,
            enable,
            debounce_ms,
        } => {
            overrides.debounce_ms = debounce_ms;
            let mut s = Session::open(&cfg, &overrides)?;
            session::set(&mut s, &feature, &assignments, enable, cli.json)
        }
        Commands::Enable { feature } => {
            let mut s = Session::open(&cfg, &overrides)?;
            session::enable(&mut s, &feature, cli.json)
        }
        Commands::Disable { feature } => {
            let mut s = Session::open(&cfg, &overrides)?;
            session::disable(&mut s, &feature, cli.json)
        }
        Commands::SelfCheck => {
            let s = Session::open(&cfg, &overrides)?;
            session::self_check(&s, cli.json)
        }
        Commands::Interactive => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
            let mut s = Session::open(&cfg, &overrides)?;
            interactive::run(&mut s, &shutdown, cli.json).map(|_| ())
        }
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}
