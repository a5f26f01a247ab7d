//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "siggen", version, about = "Dual-channel waveform generator control")]
pub struct Cli {
    /// Path to config TOML; built-in defaults and the simulated backend when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra unit families (CSV with header family,name,multiplier)
    #[arg(long, value_name = "FILE")]
    pub units: Option<PathBuf>,

    /// Output channel to address (overrides engine.channel)
    #[arg(long, value_name = "N")]
    pub channel: Option<u8>,

    /// Print results and errors as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List feature tables and their fields
    Features,
    /// Read a feature back from the instrument and print it
    Show {
        feature: String,
    },
    /// Edit fields as a user would, wait for every debounced write, then read back
    Set {
        feature: String,
        /// Assignments like `period=5ms` or `mode=Gated`
        #[arg(value_name = "FIELD=VALUE[UNIT]", required = true)]
        assignments: Vec<String>,
        /// Switch the feature on first (other enabled features are switched off)
        #[arg(long, action = ArgAction::SetTrue)]
        enable: bool,
        /// Override engine.debounce_ms for this run
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },
    /// Switch a feature on, switching every other one off
    Enable {
        feature: String,
    },
    /// Return the channel to its neutral waveform
    Disable {
        feature: String,
    },
    /// Identity query round trip
    SelfCheck,
    /// Read edit commands from stdin until EOF or Ctrl-C
    #[command(long_about = "Read commands from stdin until EOF or Ctrl-C.\n\n\
        feature.field=value[unit]   edit a field (debounced)\n\
        apply FEATURE               write every field now\n\
        enable FEATURE | disable FEATURE\n\
        channel N\n\
        refresh [FEATURE]\n\
        quit")]
    Interactive,
}
