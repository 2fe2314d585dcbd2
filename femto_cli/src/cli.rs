//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "femto", version, about = "Laser-to-RF lock controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/femto_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins, [logging].level is the fallback
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the lock supervisor against the simulated locker
    Run {
        /// Stop after this many cycles (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Request a calibration sweep on the first cycle
        #[arg(long, action = ArgAction::SetTrue)]
        calibrate: bool,
        /// Make the simulated laser slip by K RF buckets before the loop starts
        #[arg(long, value_name = "K", allow_hyphen_values = true)]
        inject_jump: Option<i64>,
    },
    /// Validate config, connect, and evaluate laser health once
    SelfCheck,
    /// Print the channel names derived from the locker's base prefix
    Channels,
}
