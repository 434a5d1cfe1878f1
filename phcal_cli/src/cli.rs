//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub const DEFAULT_CONFIG: &str = "etc/phcal.toml";

#[derive(Parser, Debug)]
#[command(name = "phcal", version, about = "pH probe three-point calibration")]
pub struct Cli {
    /// Path to config TOML; the default path may be absent (built-in defaults apply)
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Stability detection strategy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    /// Consecutive windows with stddev below the threshold
    Windowed,
    /// Identical consecutive readings
    ExactRepeat,
}

impl From<ModeArg> for phcal_core::StabilityMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Windowed => phcal_core::StabilityMode::Windowed,
            ModeArg::ExactRepeat => phcal_core::StabilityMode::ExactRepeat,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive calibration: commands on stdin, prompts on stdout
    Run {
        /// Override the stability mode from the config
        #[arg(long, value_enum, value_name = "MODE")]
        mode: Option<ModeArg>,
        /// Override the number of consecutive stable windows required
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        stable_windows: Option<u32>,
    },
    /// Show the device's calibration status and slope
    Status,
    /// Sample readings and report per-window stability without calibrating
    Check {
        /// Number of windows to sample
        #[arg(long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        windows: u32,
    },
    /// Quick health check: ask the circuit to identify itself
    SelfCheck,
}
